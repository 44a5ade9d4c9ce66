//! # presence-accounts-backends
//!
//! Storage plugins for the presence account cache.
//!
//! ## Supported Backends
//!
//! | Backend | Feature Flag | Writes | Default priority |
//! |---------|-------------|--------|------------------|
//! | Key-file | `keyfile` | escaped text | 0 |
//! | In-memory | `memory` | typed | 100 |
//!
//! - **`all-backends`** *(default)*: enable every backend listed above.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use presence_accounts_backends::{create_backend, BackendConfig};
//! use presence_accounts_core::AccountStorage;
//!
//! # async fn example() -> presence_accounts_core::CoreResult<()> {
//! let mut storage = AccountStorage::default();
//! storage.register_plugin(create_backend(BackendConfig::Keyfile {
//!     path: "/var/lib/presence/accounts.cfg".into(),
//!     list_separator: ',',
//! }));
//! storage.load().await?;
//! # Ok(())
//! # }
//! ```

mod backends;
mod factory;
mod types;

// Re-export factory functions
pub use factory::{create_backend, get_all_backend_metadata};

// Re-export types
pub use types::{BackendConfig, BackendMetadata, BackendType};

// Re-export concrete backends (behind feature flags)
#[cfg(feature = "keyfile")]
pub use backends::{KeyfileStorage, KEYFILE_PROVIDER};

#[cfg(feature = "memory")]
pub use backends::InMemoryStorage;
