#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

//! `metadatakit-core` stores small JSON documents ("entries") for a wallet on an
//! untrusted server. Each entry lives at an address derived from the wallet seed,
//! is encrypted with AES-256-CBC, and every version is signed and hash-chained to
//! the previous one.
//!
//! The usual flow is [`MetadataService::initialize`] once per session, then
//! [`MetadataService::fetch_entry`] / [`MetadataService::save_entry`] with the
//! returned [`MetadataState`].

pub mod api;
pub use api::{MetadataApi, MetadataBody, MetadataResponse};

pub mod bootstrap;
pub use bootstrap::{Bootstrap, BootstrapState, MetadataState};

pub mod cipher;

mod credentials;
pub use credentials::*;

mod defaults;
pub use defaults::*;

pub mod derivation;
pub use derivation::MasterKey;

mod entry;
pub use entry::*;

pub mod error;
pub use error::*;

mod http_request;
pub use http_request::HttpMetadataApi;

pub mod logger;

pub mod magic;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

mod node;
pub use node::*;

pub mod payload;

mod recovery;
pub use recovery::*;

mod service;
pub use service::*;

mod store;
pub use store::*;

uniffi::setup_scaffolding!("metadatakit_core");
