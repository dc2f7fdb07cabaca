//! Bootstrap of the metadata session.
//!
//! ```text
//! Uninitialized → LoadingExistingNodes → Loaded ────────┐
//!                                     └→ NotYetCreated ─┴→ Ready
//! ```
//!
//! The root nodes are stored as a JSON record at the second-password node. The first
//! bootstrap for a wallet derives them from the master key and saves them there;
//! later bootstraps load them back.

use crate::{
    api::MetadataApi,
    credentials::{derive_second_password_node, Credentials},
    derivation::MasterKey,
    entry::ROOT_TYPE_ID,
    error::InitialisationError,
    node::{MetadataNode, RemoteMetadataNodes, RemoteMetadataNodesResponse},
    store::MetadataStore,
};

/// Session handle required by every entry read and write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataState {
    /// The root nodes entries are derived from.
    pub nodes: RemoteMetadataNodes,
    /// Node the root nodes themselves are stored under.
    pub second_password_node: MetadataNode,
}

/// States of the bootstrap machine.
#[derive(Debug)]
pub enum BootstrapState {
    /// Nothing derived yet.
    Uninitialized,
    /// Looking for root nodes stored by an earlier bootstrap.
    LoadingExistingNodes {
        /// Where the root nodes live.
        second_password_node: MetadataNode,
    },
    /// Root nodes were found and decoded.
    Loaded {
        /// Where the root nodes live.
        second_password_node: MetadataNode,
        /// The decoded root nodes.
        nodes: RemoteMetadataNodes,
    },
    /// No root nodes are stored yet.
    NotYetCreated {
        /// Where the root nodes will be stored.
        second_password_node: MetadataNode,
    },
    /// Terminal state.
    Ready(MetadataState),
}

impl BootstrapState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::LoadingExistingNodes { .. } => "LoadingExistingNodes",
            Self::Loaded { .. } => "Loaded",
            Self::NotYetCreated { .. } => "NotYetCreated",
            Self::Ready(_) => "Ready",
        }
    }
}

/// Drives [`BootstrapState`] for one wallet.
pub struct Bootstrap<'a, A> {
    store: &'a MetadataStore<A>,
    credentials: &'a Credentials,
    master_key: &'a MasterKey,
}

impl<'a, A: MetadataApi> Bootstrap<'a, A> {
    /// Prepares a bootstrap; nothing is fetched until [`Self::run`] or [`Self::step`].
    #[must_use]
    pub const fn new(
        store: &'a MetadataStore<A>,
        credentials: &'a Credentials,
        master_key: &'a MasterKey,
    ) -> Self {
        Self {
            store,
            credentials,
            master_key,
        }
    }

    /// Runs the machine from `Uninitialized` to `Ready`.
    ///
    /// # Errors
    /// See [`InitialisationError`]. Every failure is terminal.
    pub async fn run(&self) -> Result<MetadataState, InitialisationError> {
        let mut state = BootstrapState::Uninitialized;
        loop {
            if let BootstrapState::Ready(metadata_state) = state {
                return Ok(metadata_state);
            }
            state = self.step(state).await?;
        }
    }

    /// Performs a single transition. `Ready` is returned unchanged.
    ///
    /// # Errors
    /// See [`InitialisationError`].
    pub async fn step(&self, state: BootstrapState) -> Result<BootstrapState, InitialisationError> {
        let from = state.name();
        let next = match state {
            BootstrapState::Uninitialized => BootstrapState::LoadingExistingNodes {
                second_password_node: derive_second_password_node(self.credentials)?,
            },
            BootstrapState::LoadingExistingNodes {
                second_password_node,
            } => self.load(second_password_node).await?,
            BootstrapState::Loaded {
                second_password_node,
                nodes,
            } => BootstrapState::Ready(MetadataState {
                nodes,
                second_password_node,
            }),
            BootstrapState::NotYetCreated {
                second_password_node,
            } => BootstrapState::Ready(self.create(second_password_node).await?),
            ready @ BootstrapState::Ready(_) => ready,
        };
        log::debug!("metadata bootstrap: {from} -> {}", next.name());
        Ok(next)
    }

    async fn load(
        &self,
        second_password_node: MetadataNode,
    ) -> Result<BootstrapState, InitialisationError> {
        let json = match self.store.fetch_node(&second_password_node).await {
            Ok(json) => json,
            Err(err) if err.is_not_yet_created() => {
                return Ok(BootstrapState::NotYetCreated {
                    second_password_node,
                })
            }
            Err(err) => return Err(InitialisationError::FailedToLoadNodes(err)),
        };

        let response: RemoteMetadataNodesResponse = serde_json::from_str(&json)
            .map_err(|err| InitialisationError::FailedToDecodeNodes(err.to_string()))?;
        let nodes = RemoteMetadataNodes::try_from(response)
            .map_err(|err| InitialisationError::FailedToDecodeNodes(err.to_string()))?;

        Ok(BootstrapState::Loaded {
            second_password_node,
            nodes,
        })
    }

    async fn create(
        &self,
        second_password_node: MetadataNode,
    ) -> Result<MetadataState, InitialisationError> {
        let nodes = RemoteMetadataNodes::derive(self.master_key)?;
        let json = serde_json::to_string(&nodes.to_response()?)
            .map_err(|err| InitialisationError::FailedToEncodeNodes(err.to_string()))?;

        self.store
            .save_node(&second_password_node, ROOT_TYPE_ID, &json)
            .await
            .map_err(InitialisationError::FailedToSaveNodes)?;

        Ok(MetadataState {
            nodes,
            second_password_node,
        })
    }
}
