//! Remote metadata store client.
//!
//! Reads are `GET → verify signature → decrypt`. Writes are
//! `validate → encrypt → GET current → chain magic hash → sign → PUT`.

use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
    api::{MetadataApi, MetadataBody, MetadataResponse, RECORD_VERSION},
    cipher,
    entry::{derive_entry_node, EntryType},
    error::{FetchError, MagicHashError, SaveError},
    magic::{self, MagicHash},
    node::{MetadataNode, RemoteMetadataNodes},
    payload::{self, decode_payload},
};

/// Client for reading and writing encrypted entries through a [`MetadataApi`].
pub struct MetadataStore<A> {
    api: A,
    save_retry_delay: Duration,
}

/// A failed save attempt and whether it hit the create-then-write race.
#[derive(Debug)]
struct SaveAttemptError {
    error: SaveError,
    write_race: bool,
}

impl From<SaveError> for SaveAttemptError {
    fn from(error: SaveError) -> Self {
        Self {
            error,
            write_race: false,
        }
    }
}

impl<A: MetadataApi> MetadataStore<A> {
    /// Wraps a transport; `save_retry_delay` separates a save from its single retry.
    #[must_use]
    pub const fn new(api: A, save_retry_delay: Duration) -> Self {
        Self {
            api,
            save_retry_delay,
        }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Fetches and decrypts the entry of `entry_type`.
    ///
    /// # Errors
    /// [`FetchError::NotYetCreated`] if nothing is stored yet, otherwise see [`FetchError`].
    pub async fn fetch(
        &self,
        entry_type: EntryType,
        nodes: &RemoteMetadataNodes,
    ) -> Result<String, FetchError> {
        let node = derive_entry_node(&nodes.metadata_node, entry_type)?;
        self.fetch_node(&node).await
    }

    /// Encrypts, signs and writes `json` as the entry of `entry_type`.
    ///
    /// # Errors
    /// See [`SaveError`]. Only the create-then-write race is retried, once.
    pub async fn save(
        &self,
        entry_type: EntryType,
        nodes: &RemoteMetadataNodes,
        json: &str,
    ) -> Result<(), SaveError> {
        let node = derive_entry_node(&nodes.metadata_node, entry_type)?;
        self.save_node(&node, entry_type.type_id(), json).await
    }

    /// Fetches and decrypts the record stored under `node`.
    ///
    /// # Errors
    /// See [`FetchError`].
    pub async fn fetch_node(&self, node: &MetadataNode) -> Result<String, FetchError> {
        let record = self.fetch_record(node.address()).await?;
        let blob = decode_payload(&record.payload)?;

        let message = magic::message(&blob, decode_prev_magic_hash(&record)?.as_deref())?;
        if !magic::verify(&message, &record.signature, node) {
            return Err(FetchError::InvalidSignature {
                address: node.address().to_string(),
            });
        }

        Ok(payload::decrypt_blob(node, &blob)?)
    }

    /// Writes `json` under `node` with the given `type_id`.
    ///
    /// # Errors
    /// See [`SaveError`].
    pub async fn save_node(
        &self,
        node: &MetadataNode,
        type_id: i32,
        json: &str,
    ) -> Result<(), SaveError> {
        payload::validate_json(json).map_err(SaveError::FailedToValidateJSON)?;

        (|| self.save_attempt(node, type_id, json))
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.save_retry_delay)
                    .with_max_times(1),
            )
            .sleep(tokio::time::sleep)
            .when(|attempt: &SaveAttemptError| attempt.write_race)
            .notify(|attempt: &SaveAttemptError, delay: Duration| {
                log::warn!(
                    "retrying metadata save to {} in {delay:?}: {}",
                    node.address(),
                    attempt.error
                );
            })
            .await
            .map_err(|attempt| attempt.error)
    }

    async fn save_attempt(
        &self,
        node: &MetadataNode,
        type_id: i32,
        json: &str,
    ) -> Result<(), SaveAttemptError> {
        let ciphertext = cipher::encrypt(node.encryption_key().as_bytes(), json.as_bytes())
            .map_err(SaveError::FailedToEncryptPayload)?;

        let prev_magic_hash = self.fetch_magic(node.address()).await?;
        let message = magic::message(&ciphertext, prev_magic_hash.as_ref().map(|h| h.as_slice()))
            .map_err(SaveError::FailedToCreateMessage)?;
        let signature = magic::sign(&message, node);

        let body = MetadataBody {
            version: RECORD_VERSION,
            payload: STANDARD.encode(&ciphertext),
            signature,
            prev_magic_hash: prev_magic_hash.map(hex::encode),
            type_id,
        };

        match self.api.put_entry(node.address(), &body).await {
            Ok(()) => {
                log::debug!("saved metadata entry {type_id} at {}", node.address());
                Ok(())
            }
            Err(err) if err.is_conflict() => Err(SaveError::Conflict {
                address: node.address().to_string(),
            }
            .into()),
            Err(err) => Err(SaveAttemptError {
                write_race: body.prev_magic_hash.is_none() && err.is_not_found(),
                error: SaveError::FailedToPutMetadata(err),
            }),
        }
    }

    /// Magic hash of the record currently stored at `address`, `None` if there is none.
    async fn fetch_magic(&self, address: &str) -> Result<Option<MagicHash>, SaveError> {
        let record = match self.api.fetch_entry(address).await {
            Ok(record) => record,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(SaveError::Network(err)),
        };
        magic::compute_record_magic(&record.payload, record.prev_magic_hash.as_deref())
            .map(Some)
            .map_err(SaveError::FailedToCreateMagicHash)
    }

    async fn fetch_record(&self, address: &str) -> Result<MetadataResponse, FetchError> {
        match self.api.fetch_entry(address).await {
            Ok(record) => Ok(record),
            Err(err) if err.is_not_found() => Err(FetchError::NotYetCreated),
            Err(err) => Err(FetchError::Network(err)),
        }
    }
}

fn decode_prev_magic_hash(record: &MetadataResponse) -> Result<Option<Vec<u8>>, MagicHashError> {
    record
        .prev_magic_hash
        .as_deref()
        .map(hex::decode)
        .transpose()
        .map_err(|err| MagicHashError::InvalidRecord(format!("prev_magic_hash: {err}")))
}
