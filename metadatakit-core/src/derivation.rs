//! Hardened HD derivation with domain-separated purpose indices.
//!
//! A purpose index is recomputed from its domain string every time, so the whole
//! metadata tree can be rebuilt from the seed alone:
//!
//! ```text
//! index = u32_be(SHA256("info.blockchain." || suffix)[0..4]) & 0x7fffffff
//! child = ckd_priv(parent, index')
//! ```

use std::{fmt, sync::OnceLock};

use bip39::{Language, Mnemonic};
use bitcoin::{
    bip32::{ChildNumber, Xpriv},
    secp256k1::{All, Secp256k1},
    Network,
};
use sha2::{Digest, Sha256};

use crate::error::DerivationError;

/// Prefix prepended to every domain suffix before hashing.
pub const DOMAIN_PREFIX: &str = "info.blockchain.";

/// Domain suffix of the root node holding every entry type.
pub const METADATA_PURPOSE: &str = "metadata";

/// Domain suffix of the shared (MDID) root node.
pub const MDID_PURPOSE: &str = "mdid";

const HARDENED_INDEX_MASK: u32 = 0x7fff_ffff;

/// Process-wide secp256k1 context, shared by derivation, addressing and signing.
pub(crate) fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

/// Root extended private key of a wallet, derived from its BIP39 seed.
///
/// Owned by the caller for the wallet session and only borrowed here.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey(Xpriv);

impl MasterKey {
    /// Builds the master key from a BIP39 seed.
    ///
    /// # Errors
    /// Returns [`DerivationError::InvalidSeed`] if the seed is rejected by BIP32.
    pub fn from_seed(seed: &[u8]) -> Result<Self, DerivationError> {
        Xpriv::new_master(Network::Bitcoin, seed)
            .map(Self)
            .map_err(|err| DerivationError::InvalidSeed(err.to_string()))
    }

    /// Builds the master key from an English BIP39 mnemonic and optional passphrase.
    ///
    /// # Errors
    /// Returns [`DerivationError::InvalidMnemonic`] if the phrase is not valid.
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self, DerivationError> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase.trim())
            .map_err(|err| DerivationError::InvalidMnemonic(err.to_string()))?;
        Self::from_seed(&mnemonic.to_seed_normalized(passphrase))
    }

    /// Wraps an existing extended private key.
    #[must_use]
    pub const fn from_xpriv(xpriv: Xpriv) -> Self {
        Self(xpriv)
    }

    /// Returns the underlying extended private key.
    #[must_use]
    pub const fn xpriv(&self) -> &Xpriv {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Computes the hardened purpose index for a domain suffix.
///
/// # Errors
/// Returns [`DerivationError::DerivationFailed`] if the digest is shorter than 4 bytes.
pub fn purpose_index(domain_suffix: &str) -> Result<u32, DerivationError> {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_PREFIX.as_bytes());
    hasher.update(domain_suffix.as_bytes());
    let hash = hasher.finalize();

    let prefix: [u8; 4] = hash
        .get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| DerivationError::DerivationFailed {
            domain: domain_suffix.to_string(),
            error: "domain hash shorter than 4 bytes".to_string(),
        })?;
    Ok(u32::from_be_bytes(prefix) & HARDENED_INDEX_MASK)
}

/// Derives the hardened child for `domain_suffix` from `parent`.
///
/// # Errors
/// Returns [`DerivationError::DerivationFailed`] if the index is out of range or
/// the key library rejects the derivation.
pub fn derive(parent: &Xpriv, domain_suffix: &str) -> Result<Xpriv, DerivationError> {
    let index = purpose_index(domain_suffix)?;
    derive_hardened(parent, index, domain_suffix)
}

/// Derives the hardened child at `index`; `domain` only labels errors.
///
/// # Errors
/// Returns [`DerivationError::DerivationFailed`] on any key library failure.
pub fn derive_hardened(
    parent: &Xpriv,
    index: u32,
    domain: &str,
) -> Result<Xpriv, DerivationError> {
    let failed = |error: String| DerivationError::DerivationFailed {
        domain: domain.to_string(),
        error,
    };
    let child = ChildNumber::from_hardened_idx(index).map_err(|err| failed(err.to_string()))?;
    parent
        .derive_priv(secp(), &[child])
        .map_err(|err| failed(err.to_string()))
}
