//! Credential recovery from a mnemonic alone.

use crate::{
    api::MetadataApi,
    bootstrap::MetadataState,
    credentials::{derive_second_password_node, Credentials},
    derivation::MasterKey,
    entry::EntryType,
    error::RecoveryError,
    node::RemoteMetadataNodes,
    store::MetadataStore,
};

/// Outcome of a successful recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryContext {
    /// Session for the recovered wallet.
    pub state: MetadataState,
    /// Credentials read back from the wallet credentials entry.
    pub credentials: Credentials,
}

/// Rebuilds the session and the login credentials from `mnemonic`.
///
/// The root nodes come straight from the master key; the second-password node is
/// derived once the credentials have been read.
///
/// # Errors
/// A [`RecoveryError`] tagged with the stage that failed.
pub async fn initialize_and_recover_credentials<A: MetadataApi>(
    store: &MetadataStore<A>,
    mnemonic: &str,
) -> Result<RecoveryContext, RecoveryError> {
    let master_key =
        MasterKey::from_mnemonic(mnemonic, "").map_err(RecoveryError::FailedToDeriveMasterKey)?;
    let nodes =
        RemoteMetadataNodes::derive(&master_key).map_err(RecoveryError::FailedToDeriveNodes)?;

    let json = store
        .fetch(EntryType::WalletCredentials, &nodes)
        .await
        .map_err(RecoveryError::FailedToFetchCredentials)?;
    let credentials: Credentials = serde_json::from_str(&json)
        .map_err(|err| RecoveryError::FailedToDecodeCredentials(err.to_string()))?;

    let second_password_node = derive_second_password_node(&credentials)
        .map_err(RecoveryError::FailedToDeriveSecondPasswordNode)?;
    log::debug!(
        "recovered credentials for metadata root {}",
        nodes.metadata_node.address()
    );

    Ok(RecoveryContext {
        state: MetadataState {
            nodes,
            second_password_node,
        },
        credentials,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::memory::InMemoryMetadataApi;

    const MNEMONIC: &str =
        "letter advice cage absurd amount doctor acoustic avoid letter advice cage above";

    fn store() -> MetadataStore<InMemoryMetadataApi> {
        MetadataStore::new(InMemoryMetadataApi::new(), Duration::from_secs(1))
    }

    fn nodes() -> RemoteMetadataNodes {
        RemoteMetadataNodes::derive(&MasterKey::from_mnemonic(MNEMONIC, "").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_recovers_stored_credentials() {
        let store = store();
        store
            .save(
                EntryType::WalletCredentials,
                &nodes(),
                r#"{"guid":"g","sharedKey":"s","password":"p"}"#,
            )
            .await
            .unwrap();

        let context = initialize_and_recover_credentials(&store, MNEMONIC)
            .await
            .unwrap();
        let expected = Credentials::new("g", "s", "p");
        assert_eq!(context.credentials, expected);
        assert_eq!(context.state.nodes, nodes());
        assert_eq!(
            context.state.second_password_node,
            derive_second_password_node(&expected).unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalid_mnemonic() {
        let err = initialize_and_recover_credentials(&store(), "not a mnemonic")
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::FailedToDeriveMasterKey(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_entry() {
        let err = initialize_and_recover_credentials(&store(), MNEMONIC)
            .await
            .unwrap_err();
        assert!(
            matches!(err, RecoveryError::FailedToFetchCredentials(ref e) if e.is_not_yet_created())
        );
    }

    #[tokio::test]
    async fn test_malformed_credentials_entry() {
        let store = store();
        store
            .save(EntryType::WalletCredentials, &nodes(), r#"{"guid":"g"}"#)
            .await
            .unwrap();
        let err = initialize_and_recover_credentials(&store, MNEMONIC)
            .await
            .unwrap_err();
        assert!(matches!(err, RecoveryError::FailedToDecodeCredentials(_)));
    }
}
