//! Application bootstrap for the presence account cache.
//!
//! Provides `StorageConfig` (what to register), `AppStateBuilder` (backend
//! and identifier injection) and `AppState` (the wired-up account cache).

pub mod config;

use std::sync::Arc;

use presence_accounts_backends::{create_backend, KeyfileStorage};
use presence_accounts_core::error::CoreResult;
use presence_accounts_core::traits::{ProtocolIdentifier, StoragePlugin};
use presence_accounts_core::{AccountStorage, Codec};

pub use config::{StorageConfig, ENV_CONFIG};

/// The account cache together with the configuration it was built from.
///
/// Frontends construct this once via `AppStateBuilder`, then call
/// [`run_startup`](Self::run_startup) before serving anything.
pub struct AppState {
    pub config: StorageConfig,
    pub storage: AccountStorage,
}

impl AppState {
    /// Load every account from the registered backends, then tell the
    /// backends the cache is ready.
    ///
    /// A fatal load error (two backends claiming one account) aborts
    /// startup; `ready` is not broadcast in that case.
    pub async fn run_startup(&mut self) -> CoreResult<()> {
        if let Err(e) = self.storage.load().await {
            log::error!("Account loading failed: {e}");
            return Err(e);
        }
        self.storage.ready();
        log::info!(
            "Account storage ready: {} accounts from {} backends",
            self.storage.accounts().len(),
            self.storage.plugins().count()
        );
        Ok(())
    }
}

/// Builder for `AppState`.
///
/// The key-file backend from the configuration is always registered, along
/// with the configured `extraBackends`. Further backends and a protocol
/// identifier can be injected by the frontend.
pub struct AppStateBuilder {
    config: StorageConfig,
    backends: Vec<Arc<dyn StoragePlugin>>,
    identifier: Option<Arc<dyn ProtocolIdentifier>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            backends: Vec::new(),
            identifier: None,
        }
    }

    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn StoragePlugin>) -> Self {
        self.backends.push(backend);
        self
    }

    #[must_use]
    pub fn identifier(mut self, identifier: Arc<dyn ProtocolIdentifier>) -> Self {
        self.identifier = Some(identifier);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> CoreResult<AppState> {
        self.config.validate()?;

        let separator = self.config.list_separator;
        let mut storage = AccountStorage::new(Codec::new(separator));
        storage.register_plugin(Arc::new(KeyfileStorage::new(
            self.config.keyfile_path.clone(),
            separator,
        )));
        for backend in &self.config.extra_backends {
            storage.register_plugin(create_backend(backend.clone()));
        }
        for backend in self.backends {
            storage.register_plugin(backend);
        }
        if let Some(identifier) = self.identifier {
            storage.set_identifier(identifier);
        }

        Ok(AppState {
            config: self.config,
            storage,
        })
    }
}
