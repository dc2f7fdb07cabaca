//! Common test utilities shared across integration tests.

#![allow(dead_code, missing_docs)]

use std::time::Duration;

use metadatakit_core::{
    memory::InMemoryMetadataApi, MasterKey, MetadataConfig, MetadataService,
};

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn config() -> MetadataConfig {
    MetadataConfig {
        save_retry_delay: Duration::from_millis(10),
        ..MetadataConfig::default()
    }
}

pub fn service() -> MetadataService<InMemoryMetadataApi> {
    MetadataService::new(InMemoryMetadataApi::new(), &config())
}

pub fn master_key() -> MasterKey {
    MasterKey::from_mnemonic(MNEMONIC, "").expect("valid mnemonic")
}
