//! Entry types and the per-entry node each of them is stored under.
//!
//! ```text
//! type_node  = derive(metadata_root, suffix(type))
//! signing    = type_node/0'
//! encryption = SHA256(privkey(type_node/1'))
//! ```

use bitcoin::bip32::Xpriv;
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    derivation,
    error::DerivationError,
    node::{EncryptionKey, MetadataNode},
};

/// `type_id` of the record that stores the serialized root nodes.
pub const ROOT_TYPE_ID: i32 = -1;

const SIGNING_CHILD: u32 = 0;
const ENCRYPTION_CHILD: u32 = 1;

/// A logical record kind. Each has its own address and keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum EntryType {
    /// Seen announcements.
    WhatsNew,
    /// Buy/sell provider state.
    BuySell,
    /// Contacts.
    Contacts,
    /// Ethereum account.
    Ethereum,
    /// Shapeshift trades.
    Shapeshift,
    /// Bitcoin Cash accounts.
    BitcoinCash,
    /// Bitcoin account labels.
    Bitcoin,
    /// Exchange user credentials.
    UserCredentials,
    /// Stellar account.
    Stellar,
    /// Wallet login credentials, used for recovery from the seed phrase.
    WalletCredentials,
    /// WalletConnect sessions.
    WalletConnect,
    /// Custodial account credentials.
    AccountCredentials,
}

impl EntryType {
    /// Identifier sent as `type_id` with each record.
    #[must_use]
    pub const fn type_id(self) -> i32 {
        match self {
            Self::WhatsNew => 2,
            Self::BuySell => 3,
            Self::Contacts => 4,
            Self::Ethereum => 5,
            Self::Shapeshift => 6,
            Self::BitcoinCash => 7,
            Self::Bitcoin => 8,
            Self::UserCredentials => 10,
            Self::Stellar => 11,
            Self::WalletCredentials => 12,
            Self::WalletConnect => 13,
            Self::AccountCredentials => 14,
        }
    }

    /// Domain suffix fed into the purpose-index hash.
    #[must_use]
    pub fn domain_suffix(self) -> &'static str {
        self.into()
    }
}

/// Derives the node an entry type is stored under.
///
/// # Errors
/// Returns [`DerivationError`] if `root` is not HD-derived or a child derivation fails.
pub fn derive_entry_node(
    root: &MetadataNode,
    entry_type: EntryType,
) -> Result<MetadataNode, DerivationError> {
    let suffix = entry_type.domain_suffix();
    let type_node = derivation::derive(root.require_extended_key()?, suffix)?;
    let signing_node = derivation::derive_hardened(&type_node, SIGNING_CHILD, suffix)?;
    let encryption_node = derivation::derive_hardened(&type_node, ENCRYPTION_CHILD, suffix)?;
    let (encryption_key, unpadded_encryption_key) = encryption_keys(&encryption_node);

    Ok(MetadataNode::new(
        signing_node.private_key,
        None,
        encryption_key,
        unpadded_encryption_key,
    ))
}

/// Regular key from the 32 byte padded scalar and, when it differs, the legacy
/// key from the scalar with leading zero bytes stripped.
fn encryption_keys(node: &Xpriv) -> (EncryptionKey, Option<EncryptionKey>) {
    let secret = zeroize::Zeroizing::new(node.private_key.secret_bytes());
    let regular = EncryptionKey::from_bytes(Sha256::digest(secret.as_slice()).into());
    let unpadded = strip_leading_zeros(secret.as_slice());
    let legacy = (unpadded.len() != secret.len())
        .then(|| EncryptionKey::from_bytes(Sha256::digest(unpadded).into()));
    (regular, legacy)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    &bytes[start..]
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, str::FromStr};

    use bitcoin::bip32::ChildNumber;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::{derivation::MasterKey, node::RemoteMetadataNodes};

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn metadata_root() -> MetadataNode {
        let master = MasterKey::from_mnemonic(MNEMONIC, "").unwrap();
        RemoteMetadataNodes::derive(&master).unwrap().metadata_node
    }

    #[test]
    fn test_entry_node_is_deterministic() {
        let root = metadata_root();
        let first = derive_entry_node(&root, EntryType::WalletCredentials).unwrap();
        let second = derive_entry_node(&metadata_root(), EntryType::WalletCredentials).unwrap();
        assert_eq!(first.address(), second.address());
        assert_eq!(first.encryption_key(), second.encryption_key());
    }

    #[test]
    fn test_every_entry_type_has_its_own_slot() {
        let root = metadata_root();
        let mut addresses = HashSet::new();
        let mut type_ids = HashSet::new();
        for entry_type in EntryType::iter() {
            let node = derive_entry_node(&root, entry_type).unwrap();
            assert!(addresses.insert(node.address().to_string()));
            assert!(type_ids.insert(entry_type.type_id()));
            assert_ne!(node.address(), root.address());
        }
    }

    #[test]
    fn test_entry_node_requires_hd_root() {
        let credentials = crate::credentials::Credentials::new("g", "s", "p");
        let node = crate::credentials::derive_second_password_node(&credentials).unwrap();
        assert!(matches!(
            derive_entry_node(&node, EntryType::Ethereum),
            Err(DerivationError::MissingExtendedKey { .. })
        ));
    }

    #[test]
    fn test_domain_suffix_round_trips() {
        assert_eq!(EntryType::WalletCredentials.domain_suffix(), "walletCredentials");
        assert_eq!(EntryType::WalletConnect.to_string(), "walletConnect");
        for entry_type in EntryType::iter() {
            assert_eq!(
                EntryType::from_str(entry_type.domain_suffix()).unwrap(),
                entry_type
            );
        }
    }

    #[test]
    fn test_strip_leading_zeros() {
        assert_eq!(strip_leading_zeros(&[0, 0, 1, 0]), &[1, 0]);
        assert_eq!(strip_leading_zeros(&[7, 0]), &[7, 0]);
        assert!(strip_leading_zeros(&[0, 0]).is_empty());
    }

    #[test]
    fn test_unpadded_key_only_for_leading_zero_scalars() {
        let master = MasterKey::from_seed(&[7u8; 64]).unwrap();
        let mut seen_unpadded = false;
        for index in 0..4096 {
            let child = master
                .xpriv()
                .derive_priv(
                    derivation::secp(),
                    &[ChildNumber::from_hardened_idx(index).unwrap()],
                )
                .unwrap();
            let (regular, unpadded) = encryption_keys(&child);
            let leading_zero = child.private_key.secret_bytes()[0] == 0;
            assert_eq!(unpadded.is_some(), leading_zero);
            if let Some(unpadded) = unpadded {
                assert_ne!(unpadded, regular);
                seen_unpadded = true;
            }
        }
        // about 16 in 4096 scalars start with a zero byte
        assert!(seen_unpadded);
    }
}
