//! Wallet login credentials and the second-password node derived from them.

use std::{fmt, str::FromStr};

use bitcoin::secp256k1::SecretKey;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::SecondPasswordError,
    node::{EncryptionKey, MetadataNode},
};

/// Wallet login credentials.
///
/// Only held in memory during authentication flows. The password never shows
/// up in `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Wallet identifier.
    pub guid: String,
    /// Shared key issued by the wallet backend.
    pub shared_key: String,
    #[serde(
        serialize_with = "serialize_password",
        deserialize_with = "deserialize_password"
    )]
    password: SecretString,
}

impl Credentials {
    /// Bundles the three credential parts.
    #[must_use]
    pub fn new(
        guid: impl Into<String>,
        shared_key: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            guid: guid.into(),
            shared_key: shared_key.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The plaintext password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.shared_key == other.shared_key
            && self.password() == other.password()
    }
}

impl Eq for Credentials {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("guid", &self.guid)
            .field("shared_key", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

fn serialize_password<S: serde::Serializer>(
    password: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(password.expose_secret())
}

fn deserialize_password<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Derives the node that stores the serialized root nodes of a wallet.
///
/// This is a direct key construction, not an HD path:
/// ```text
/// key = SecretKey(hex(SHA256(guid || sharedKey || password)))
/// ```
/// The node encrypts with the raw private key bytes and has no unpadded variant.
///
/// # Errors
/// Returns [`SecondPasswordError::PrivateKeyInstantiationFailed`] if the digest is
/// not a valid secp256k1 scalar.
pub fn derive_second_password_node(
    credentials: &Credentials,
) -> Result<MetadataNode, SecondPasswordError> {
    let mut hasher = Sha256::new();
    hasher.update(credentials.guid.as_bytes());
    hasher.update(credentials.shared_key.as_bytes());
    hasher.update(credentials.password().as_bytes());
    let entropy = hex::encode(hasher.finalize());

    let signing_key = SecretKey::from_str(&entropy)
        .map_err(|err| SecondPasswordError::PrivateKeyInstantiationFailed(err.to_string()))?;
    let encryption_key = EncryptionKey::from_bytes(signing_key.secret_bytes());
    Ok(MetadataNode::new(signing_key, None, encryption_key, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_password_node_is_deterministic() {
        let credentials = Credentials::new("g", "s", "p");
        let first = derive_second_password_node(&credentials).unwrap();
        let second = derive_second_password_node(&credentials).unwrap();
        assert_eq!(first, second);
        assert!(first.extended_key().is_none());
        assert!(first.unpadded_encryption_key().is_none());
    }

    #[test]
    fn test_second_password_key_is_credential_digest() {
        let credentials = Credentials::new("g", "s", "p");
        let node = derive_second_password_node(&credentials).unwrap();
        let digest: [u8; 32] = Sha256::digest(b"gsp").into();
        assert_eq!(node.signing_key().secret_bytes(), digest);
        assert_eq!(node.encryption_key().as_bytes(), &digest);
    }

    #[test]
    fn test_each_credential_changes_the_node() {
        let base = derive_second_password_node(&Credentials::new("g", "s", "p")).unwrap();
        for other in [
            Credentials::new("g2", "s", "p"),
            Credentials::new("g", "s2", "p"),
            Credentials::new("g", "s", "p2"),
        ] {
            let node = derive_second_password_node(&other).unwrap();
            assert_ne!(node.address(), base.address());
        }
    }

    #[test]
    fn test_credentials_json_shape() {
        let credentials = Credentials::new("g", "s", "p");
        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"guid": "g", "sharedKey": "s", "password": "p"})
        );

        let decoded: Credentials =
            serde_json::from_str(r#"{"guid":"g","sharedKey":"s","password":"p"}"#).unwrap();
        assert_eq!(decoded, credentials);
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let credentials = Credentials::new("guid-1", "shared-1", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("guid-1"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("shared-1"));
    }
}
