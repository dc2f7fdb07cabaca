//! In-memory implementation of [`MetadataApi`] for testing.
//!
//! Behaves like the remote endpoint: unknown addresses answer 404 and a write
//! whose `prev_magic_hash` does not match the stored record is rejected with 409.
//! Failures can be queued to exercise retry paths.

// Poisoned mutexes only happen after a panic in another test thread.
#![allow(clippy::missing_panics_doc)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use crate::{
    api::{MetadataApi, MetadataBody, MetadataResponse},
    error::NetworkError,
    magic::compute_record_magic,
};

/// In-memory metadata server double.
#[derive(Default)]
pub struct InMemoryMetadataApi {
    records: Mutex<HashMap<String, MetadataResponse>>,
    fetch_failures: Mutex<VecDeque<NetworkError>>,
    put_failures: Mutex<VecDeque<NetworkError>>,
    fetch_count: AtomicUsize,
    put_count: AtomicUsize,
}

impl InMemoryMetadataApi {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, MetadataResponse>> {
        self.records.lock().expect("records mutex poisoned")
    }

    /// Returns the record stored under `address`.
    #[must_use]
    pub fn record(&self, address: &str) -> Option<MetadataResponse> {
        self.records().get(address).cloned()
    }

    /// Stores a record directly, bypassing chain checks.
    pub fn insert_record(&self, address: &str, record: MetadataResponse) {
        self.records().insert(address.to_string(), record);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Fails the next fetch with `error`.
    pub fn fail_next_fetch(&self, error: NetworkError) {
        self.fetch_failures
            .lock()
            .expect("failure queue poisoned")
            .push_back(error);
    }

    /// Fails the next put with `error`, without storing anything.
    pub fn fail_next_put(&self, error: NetworkError) {
        self.put_failures
            .lock()
            .expect("failure queue poisoned")
            .push_back(error);
    }

    /// Number of fetches served, including failed ones.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Number of puts received, including failed ones.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    fn check_chain(&self, address: &str, body: &MetadataBody) -> Result<(), NetworkError> {
        let records = self.records();
        let expected = match records.get(address) {
            None => None,
            Some(current) => Some(
                compute_record_magic(&current.payload, current.prev_magic_hash.as_deref())
                    .map(hex::encode)
                    .map_err(|err| NetworkError::with_status(address, 500, err.to_string()))?,
            ),
        };
        if expected == body.prev_magic_hash {
            Ok(())
        } else {
            Err(NetworkError::with_status(
                address,
                409,
                "prev_magic_hash does not match the stored record",
            ))
        }
    }
}

impl MetadataApi for InMemoryMetadataApi {
    async fn fetch_entry(&self, address: &str) -> Result<MetadataResponse, NetworkError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .fetch_failures
            .lock()
            .expect("failure queue poisoned")
            .pop_front()
        {
            return Err(error);
        }
        self.record(address)
            .ok_or_else(|| NetworkError::with_status(address, 404, "not found"))
    }

    async fn put_entry(&self, address: &str, body: &MetadataBody) -> Result<(), NetworkError> {
        self.put_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self
            .put_failures
            .lock()
            .expect("failure queue poisoned")
            .pop_front()
        {
            return Err(error);
        }
        self.check_chain(address, body)?;
        let mut record = MetadataResponse::from(body.clone());
        record.address = Some(address.to_string());
        self.insert_record(address, record);
        Ok(())
    }
}
