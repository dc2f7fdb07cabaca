//! Error types for the metadata subsystem.
//!
//! Each component owns one enum. Variants are tagged by the stage that failed so
//! callers can tell transport failures apart from structural or cryptographic ones.

use thiserror::Error;

/// Errors raised while deriving HD keys and metadata nodes.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// The hardened child for a domain suffix could not be derived.
    #[error("failed to derive node for `{domain}`: {error}")]
    DerivationFailed {
        /// Domain suffix (or entry type) being derived.
        domain: String,
        /// Underlying failure.
        error: String,
    },

    /// The seed could not be turned into a master key.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// The mnemonic is not a valid BIP39 English phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// An extended private key string could not be parsed.
    #[error("invalid extended key: {0}")]
    InvalidExtendedKey(String),

    /// A child derivation was requested from a node without an extended key.
    #[error("node {address} has no extended key")]
    MissingExtendedKey {
        /// Address of the node.
        address: String,
    },
}

/// Errors raised while deriving the second-password node from credentials.
#[derive(Debug, Error)]
pub enum SecondPasswordError {
    /// The credential digest is not a valid secp256k1 private key.
    #[error("private key instantiation failed: {0}")]
    PrivateKeyInstantiationFailed(String),
}

/// Errors raised by the AES-256-CBC payload cipher.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The key is not 32 bytes.
    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// The blob is too short or not block aligned.
    #[error("invalid payload of {length} bytes")]
    InvalidPayload {
        /// Length of the rejected blob.
        length: usize,
    },

    /// CBC decryption or padding removal failed.
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Failure of a single decrypt-and-validate attempt with one key.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The cipher rejected the blob.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The plaintext is not UTF-8.
    #[error("plaintext is not valid utf-8")]
    InvalidUtf8,

    /// The plaintext is not syntactically valid JSON.
    #[error("plaintext is not valid json: {0}")]
    InvalidJson(String),
}

/// Errors raised while decrypting a stored entry.
#[derive(Debug, Error)]
pub enum DecryptError {
    /// The payload is not base64 or is too short to hold an IV and a block.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Only the regular key was available and it failed.
    #[error("failed to decrypt with regular key: {0}")]
    FailedToDecryptWithRegularKey(#[source] PayloadError),

    /// Both the regular and the unpadded key failed.
    #[error("failed to decrypt with regular key ({regular}) and unpadded key ({unpadded})")]
    FailedToDecrypt {
        /// Failure with the regular key.
        regular: PayloadError,
        /// Failure with the legacy unpadded key.
        #[source]
        unpadded: PayloadError,
    },
}

/// Errors raised while building magic-hash messages.
#[derive(Debug, Error)]
pub enum MagicHashError {
    /// A previous magic hash must be exactly 32 bytes.
    #[error("invalid previous magic hash length: {0}")]
    InvalidPrevMagicHash(usize),

    /// A stored record could not be decoded.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Transport failure reported by the remote metadata endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("network error on {url} (status {status:?}): {error}")]
pub struct NetworkError {
    /// Requested URL (or address for non-HTTP transports).
    pub url: String,
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Human readable description.
    pub error: String,
}

impl NetworkError {
    /// Builds an error carrying an HTTP status.
    #[must_use]
    pub fn with_status(url: impl Into<String>, status: u16, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            error: error.into(),
        }
    }

    /// Builds an error for a request that produced no response.
    #[must_use]
    pub fn transport(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            error: error.into(),
        }
    }

    /// Whether the server answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Whether the server rejected a write because the chain moved on.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status == Some(409)
    }
}

/// Errors raised when fetching an entry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The entry node could not be derived.
    #[error("failed to derive node: {0}")]
    FailedToDeriveNode(#[from] DerivationError),

    /// Nothing is stored at the entry address yet. A status, not a failure.
    #[error("entry not yet created")]
    NotYetCreated,

    /// Transport failure other than 404.
    #[error(transparent)]
    Network(NetworkError),

    /// The stored record is malformed.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] MagicHashError),

    /// The stored signature was not produced by the entry node's key.
    #[error("signature for {address} does not match")]
    InvalidSignature {
        /// Address the record was fetched from.
        address: String,
    },

    /// The payload could not be decrypted.
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    /// The decrypted JSON does not match the requested type.
    #[error("failed to decode entry: {0}")]
    FailedToDecodeEntry(String),
}

impl FetchError {
    /// Whether this is the not-yet-created status.
    #[must_use]
    pub const fn is_not_yet_created(&self) -> bool {
        matches!(self, Self::NotYetCreated)
    }
}

/// Errors raised when saving an entry.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The entry node could not be derived.
    #[error("failed to derive node: {0}")]
    FailedToDeriveNode(#[from] DerivationError),

    /// The value to save is not valid JSON.
    #[error("failed to validate json: {0}")]
    FailedToValidateJSON(String),

    /// The payload could not be encrypted.
    #[error("failed to encrypt payload: {0}")]
    FailedToEncryptPayload(#[source] CipherError),

    /// The magic hash of the record being superseded could not be computed.
    #[error("failed to create magic hash: {0}")]
    FailedToCreateMagicHash(#[source] MagicHashError),

    /// The message to sign could not be built.
    #[error("failed to create message: {0}")]
    FailedToCreateMessage(#[source] MagicHashError),

    /// The write was rejected by the transport.
    #[error("failed to put metadata: {0}")]
    FailedToPutMetadata(#[source] NetworkError),

    /// Another writer superseded the record this write was chained to.
    #[error("conflicting write to {address}")]
    Conflict {
        /// Address of the entry.
        address: String,
    },

    /// The read-before-write failed.
    #[error(transparent)]
    Network(NetworkError),
}

/// Errors raised by the bootstrap state machine.
#[derive(Debug, Error)]
pub enum InitialisationError {
    /// The second-password node could not be derived.
    #[error("failed to derive second password node: {0}")]
    FailedToDeriveSecondPasswordNode(#[from] SecondPasswordError),

    /// Loading the stored root nodes failed for a reason other than absence.
    #[error("failed to load metadata nodes: {0}")]
    FailedToLoadNodes(#[source] FetchError),

    /// The stored root nodes could not be decoded.
    #[error("failed to decode metadata nodes: {0}")]
    FailedToDecodeNodes(String),

    /// Fresh root nodes could not be derived from the master key.
    #[error("failed to derive metadata nodes: {0}")]
    FailedToDeriveNodes(#[from] DerivationError),

    /// Fresh root nodes could not be serialized.
    #[error("failed to encode metadata nodes: {0}")]
    FailedToEncodeNodes(String),

    /// Fresh root nodes could not be persisted.
    #[error("failed to save metadata nodes: {0}")]
    FailedToSaveNodes(#[source] SaveError),
}

/// Errors raised while recovering credentials from a mnemonic.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Mnemonic to seed to master key failed.
    #[error("failed to derive master key: {0}")]
    FailedToDeriveMasterKey(#[source] DerivationError),

    /// Master key to root nodes failed.
    #[error("failed to derive metadata nodes: {0}")]
    FailedToDeriveNodes(#[source] DerivationError),

    /// The wallet credentials entry could not be fetched.
    #[error("failed to fetch wallet credentials: {0}")]
    FailedToFetchCredentials(#[source] FetchError),

    /// The wallet credentials entry is not the expected JSON.
    #[error("failed to decode wallet credentials: {0}")]
    FailedToDecodeCredentials(String),

    /// The second-password node for the recovered credentials failed.
    #[error("failed to derive second password node: {0}")]
    FailedToDeriveSecondPasswordNode(#[source] SecondPasswordError),
}
