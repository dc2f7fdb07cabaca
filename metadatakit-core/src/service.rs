//! High-level entry point tying bootstrap, recovery and entry access together.

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    api::MetadataApi,
    bootstrap::{Bootstrap, MetadataState},
    credentials::Credentials,
    defaults::MetadataConfig,
    derivation::MasterKey,
    entry::EntryType,
    error::{FetchError, InitialisationError, RecoveryError, SaveError},
    http_request::HttpMetadataApi,
    recovery::{self, RecoveryContext},
    store::MetadataStore,
};

/// Entry point for wallet metadata: session bootstrap, recovery and entry access.
///
/// State is never held here; callers pass the [`MetadataState`] returned by
/// [`Self::initialize`] to every entry operation.
pub struct MetadataService<A> {
    store: MetadataStore<A>,
}

impl MetadataService<HttpMetadataApi> {
    /// Service talking to the metadata endpoint described by `config`.
    #[must_use]
    pub fn http(config: &MetadataConfig) -> Self {
        Self::new(HttpMetadataApi::new(config), config)
    }
}

impl<A: MetadataApi> MetadataService<A> {
    /// Service over any transport.
    #[must_use]
    pub const fn new(api: A, config: &MetadataConfig) -> Self {
        Self {
            store: MetadataStore::new(api, config.save_retry_delay),
        }
    }

    /// The underlying store client.
    #[must_use]
    pub const fn store(&self) -> &MetadataStore<A> {
        &self.store
    }

    /// Loads the root nodes for a wallet, creating them on first use.
    ///
    /// # Errors
    /// See [`InitialisationError`].
    pub async fn initialize(
        &self,
        credentials: &Credentials,
        master_key: &MasterKey,
    ) -> Result<MetadataState, InitialisationError> {
        Bootstrap::new(&self.store, credentials, master_key)
            .run()
            .await
    }

    /// Recovers the session and the login credentials from a mnemonic.
    ///
    /// # Errors
    /// See [`RecoveryError`].
    pub async fn initialize_and_recover_credentials(
        &self,
        mnemonic: &str,
    ) -> Result<RecoveryContext, RecoveryError> {
        recovery::initialize_and_recover_credentials(&self.store, mnemonic).await
    }

    /// Fetches the JSON of an entry.
    ///
    /// # Errors
    /// See [`FetchError`]; an absent entry is [`FetchError::NotYetCreated`].
    pub async fn fetch_entry(
        &self,
        entry_type: EntryType,
        state: &MetadataState,
    ) -> Result<String, FetchError> {
        self.store.fetch(entry_type, &state.nodes).await
    }

    /// Replaces the JSON of an entry.
    ///
    /// # Errors
    /// See [`SaveError`].
    pub async fn save_entry(
        &self,
        entry_type: EntryType,
        state: &MetadataState,
        json: &str,
    ) -> Result<(), SaveError> {
        self.store.save(entry_type, &state.nodes, json).await
    }

    /// Fetches an entry and decodes it into `T`.
    ///
    /// # Errors
    /// As [`Self::fetch_entry`], plus [`FetchError::FailedToDecodeEntry`].
    pub async fn fetch_entry_as<T: DeserializeOwned>(
        &self,
        entry_type: EntryType,
        state: &MetadataState,
    ) -> Result<T, FetchError> {
        let json = self.fetch_entry(entry_type, state).await?;
        serde_json::from_str(&json).map_err(|err| FetchError::FailedToDecodeEntry(err.to_string()))
    }

    /// Encodes `value` as JSON and saves it as an entry.
    ///
    /// # Errors
    /// As [`Self::save_entry`]; an unserializable value is [`SaveError::FailedToValidateJSON`].
    pub async fn save_entry_as<T: Serialize + Sync>(
        &self,
        entry_type: EntryType,
        state: &MetadataState,
        value: &T,
    ) -> Result<(), SaveError> {
        let json = serde_json::to_string(value)
            .map_err(|err| SaveError::FailedToValidateJSON(err.to_string()))?;
        self.save_entry(entry_type, state, &json).await
    }
}
