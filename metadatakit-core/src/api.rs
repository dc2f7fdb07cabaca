//! Remote metadata endpoint: wire records and the transport interface.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Version written into every new record.
pub const RECORD_VERSION: u32 = 1;

/// A record as returned by `GET /metadata/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResponse {
    /// Base64 `IV || ciphertext`.
    pub payload: String,
    /// Base64 compact signature over the record's magic hash.
    pub signature: String,
    /// Hex magic hash of the record this one superseded.
    #[serde(default)]
    pub prev_magic_hash: Option<String>,
    /// Entry type id.
    #[serde(default)]
    pub type_id: Option<i32>,
    /// Record format version.
    #[serde(default)]
    pub version: Option<u32>,
    /// Creation time in milliseconds, server assigned.
    #[serde(default)]
    pub created_at: Option<u64>,
    /// Last update time in milliseconds, server assigned.
    #[serde(default)]
    pub updated_at: Option<u64>,
    /// Address the record is stored under.
    #[serde(default)]
    pub address: Option<String>,
}

/// The body of `PUT /metadata/{address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataBody {
    /// Record format version, always [`RECORD_VERSION`].
    pub version: u32,
    /// Base64 `IV || ciphertext`.
    pub payload: String,
    /// Base64 compact signature.
    pub signature: String,
    /// Hex magic hash of the record being superseded; absent on the first write.
    pub prev_magic_hash: Option<String>,
    /// Entry type id.
    pub type_id: i32,
}

impl From<MetadataBody> for MetadataResponse {
    fn from(body: MetadataBody) -> Self {
        Self {
            payload: body.payload,
            signature: body.signature,
            prev_magic_hash: body.prev_magic_hash,
            type_id: Some(body.type_id),
            version: Some(body.version),
            created_at: None,
            updated_at: None,
            address: None,
        }
    }
}

/// Raw GET/PUT primitives against the metadata endpoint.
///
/// Implementations must report HTTP 404 as a [`NetworkError`] with status 404 so
/// the store can tell a missing record from a failed request.
pub trait MetadataApi: Send + Sync {
    /// Fetches the current record stored under `address`.
    fn fetch_entry(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<MetadataResponse, NetworkError>> + Send;

    /// Writes a new version of the record stored under `address`.
    fn put_entry(
        &self,
        address: &str,
        body: &MetadataBody,
    ) -> impl Future<Output = Result<(), NetworkError>> + Send;
}
