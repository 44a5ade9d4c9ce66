//! Storage backend implementations

#[cfg(feature = "keyfile")]
mod keyfile;
#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "keyfile")]
pub use keyfile::{KeyfileStorage, KEYFILE_PROVIDER};
#[cfg(feature = "memory")]
pub use memory::InMemoryStorage;
