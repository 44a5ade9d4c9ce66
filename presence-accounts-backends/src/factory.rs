//! Backend factory functions and metadata.

use std::sync::Arc;

use presence_accounts_core::StoragePlugin;

use crate::types::{BackendConfig, BackendMetadata};

#[cfg(feature = "memory")]
use crate::backends::InMemoryStorage;
#[cfg(feature = "keyfile")]
use crate::backends::KeyfileStorage;

/// Creates a [`StoragePlugin`] from its configuration.
///
/// The returned plugin is ready to be registered with an
/// `AccountStorage`.
pub fn create_backend(config: BackendConfig) -> Arc<dyn StoragePlugin> {
    match config {
        #[cfg(feature = "keyfile")]
        BackendConfig::Keyfile {
            path,
            list_separator,
        } => Arc::new(KeyfileStorage::new(path, list_separator)),
        #[cfg(feature = "memory")]
        BackendConfig::Memory {
            name,
            priority,
            provider,
            refuse_create,
        } => {
            let mut backend = InMemoryStorage::new(name, priority);
            if let Some(provider) = provider {
                backend = backend.with_provider(provider);
            }
            if refuse_create {
                backend = backend.refusing_create();
            }
            Arc::new(backend)
        }
    }
}

/// Returns metadata for all backends enabled via feature flags.
pub fn get_all_backend_metadata() -> Vec<BackendMetadata> {
    vec![
        #[cfg(feature = "keyfile")]
        KeyfileStorage::metadata(),
        #[cfg(feature = "memory")]
        InMemoryStorage::metadata(),
    ]
}
