//! Metadata nodes: the address, signing key and encryption keys of one storage slot.

use std::{fmt, str::FromStr};

use bitcoin::{
    bip32::Xpriv,
    secp256k1::{PublicKey, SecretKey},
    Address, Network,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    derivation::{self, MasterKey, MDID_PURPOSE, METADATA_PURPOSE},
    error::DerivationError,
};

/// Raw AES-256 key bytes. Never transmitted, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes. Treat as sensitive.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// One storage slot on the remote metadata server.
///
/// `address` is public and used as the lookup key; the signing key authorizes
/// writes and the encryption keys never leave the device.
#[derive(Clone, PartialEq, Eq)]
pub struct MetadataNode {
    address: String,
    signing_key: SecretKey,
    extended_key: Option<Xpriv>,
    encryption_key: EncryptionKey,
    unpadded_encryption_key: Option<EncryptionKey>,
}

impl MetadataNode {
    /// Assembles a node from its parts.
    #[must_use]
    pub fn new(
        signing_key: SecretKey,
        extended_key: Option<Xpriv>,
        encryption_key: EncryptionKey,
        unpadded_encryption_key: Option<EncryptionKey>,
    ) -> Self {
        Self {
            address: address_for(&signing_key),
            signing_key,
            extended_key,
            encryption_key,
            unpadded_encryption_key,
        }
    }

    /// Builds a root node from an extended key: it signs with its own key and
    /// encrypts with the raw private key bytes.
    #[must_use]
    pub fn from_xpriv(xpriv: Xpriv) -> Self {
        let signing_key = xpriv.private_key;
        let encryption_key = EncryptionKey::from_bytes(signing_key.secret_bytes());
        Self::new(signing_key, Some(xpriv), encryption_key, None)
    }

    /// Builds a root node from a serialized `xprv...` string.
    ///
    /// # Errors
    /// Returns [`DerivationError::InvalidExtendedKey`] if the string does not parse.
    pub fn from_xpriv_str(xpriv: &str) -> Result<Self, DerivationError> {
        Xpriv::from_str(xpriv)
            .map(Self::from_xpriv)
            .map_err(|err| DerivationError::InvalidExtendedKey(err.to_string()))
    }

    /// Base58 P2PKH address of the signing key.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Private key used to sign writes.
    #[must_use]
    pub const fn signing_key(&self) -> &SecretKey {
        &self.signing_key
    }

    /// Compressed public key matching [`Self::signing_key`].
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(derivation::secp(), &self.signing_key)
    }

    /// Extended key, present on HD-derived root nodes.
    #[must_use]
    pub const fn extended_key(&self) -> Option<&Xpriv> {
        self.extended_key.as_ref()
    }

    /// Key payloads are encrypted with.
    #[must_use]
    pub const fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }

    /// Legacy key older clients derived without zero padding.
    #[must_use]
    pub const fn unpadded_encryption_key(&self) -> Option<&EncryptionKey> {
        self.unpadded_encryption_key.as_ref()
    }

    /// Returns the extended key or fails with the node's address.
    ///
    /// # Errors
    /// Returns [`DerivationError::MissingExtendedKey`] for non-HD nodes.
    pub fn require_extended_key(&self) -> Result<&Xpriv, DerivationError> {
        self.extended_key
            .as_ref()
            .ok_or_else(|| DerivationError::MissingExtendedKey {
                address: self.address.clone(),
            })
    }
}

impl fmt::Debug for MetadataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataNode")
            .field("address", &self.address)
            .field("has_extended_key", &self.extended_key.is_some())
            .field("has_unpadded_key", &self.unpadded_encryption_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Computes the mainnet P2PKH address of the compressed public key.
pub(crate) fn address_for(signing_key: &SecretKey) -> String {
    let public_key =
        bitcoin::PublicKey::new(PublicKey::from_secret_key(derivation::secp(), signing_key));
    Address::p2pkh(public_key.pubkey_hash(), Network::Bitcoin).to_string()
}

/// The two root derivations every entry hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMetadataNodes {
    /// Root of the "metadata" purpose.
    pub metadata_node: MetadataNode,
    /// Root of the "mdid" purpose.
    pub shared_metadata_node: Option<MetadataNode>,
}

impl RemoteMetadataNodes {
    /// Derives both root nodes from the master key.
    ///
    /// # Errors
    /// Returns [`DerivationError`] if either hardened derivation fails.
    pub fn derive(master_key: &MasterKey) -> Result<Self, DerivationError> {
        let metadata = derivation::derive(master_key.xpriv(), METADATA_PURPOSE)?;
        let mdid = derivation::derive(master_key.xpriv(), MDID_PURPOSE)?;
        Ok(Self {
            metadata_node: MetadataNode::from_xpriv(metadata),
            shared_metadata_node: Some(MetadataNode::from_xpriv(mdid)),
        })
    }

    /// Serializable form stored at the second-password node.
    ///
    /// # Errors
    /// Returns [`DerivationError::MissingExtendedKey`] if a node is not HD-derived.
    pub fn to_response(&self) -> Result<RemoteMetadataNodesResponse, DerivationError> {
        let metadata = self.metadata_node.require_extended_key()?.to_string();
        let mdid = self
            .shared_metadata_node
            .as_ref()
            .map(|node| node.require_extended_key().map(ToString::to_string))
            .transpose()?;
        Ok(RemoteMetadataNodesResponse { metadata, mdid })
    }
}

/// JSON form of [`RemoteMetadataNodes`]: both roots as `xprv` strings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadataNodesResponse {
    /// Extended key of the "metadata" root.
    pub metadata: String,
    /// Extended key of the "mdid" root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdid: Option<String>,
}

impl fmt::Debug for RemoteMetadataNodesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteMetadataNodesResponse")
            .field("metadata", &"[REDACTED]")
            .field("mdid", &self.mdid.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TryFrom<RemoteMetadataNodesResponse> for RemoteMetadataNodes {
    type Error = DerivationError;

    fn try_from(response: RemoteMetadataNodesResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            metadata_node: MetadataNode::from_xpriv_str(&response.metadata)?,
            shared_metadata_node: response
                .mdid
                .as_deref()
                .map(MetadataNode::from_xpriv_str)
                .transpose()?,
        })
    }
}
