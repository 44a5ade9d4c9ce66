//! Presence Accounts Core Library
//!
//! The account persistence layer of a presence session manager:
//! - Typed values, the attribute schema and the flat `param-` key namespace
//! - The escaped value codec and an in-memory key-file model
//! - The storage plugin contract and the write-back interface plugins use
//! - `AccountStorage`, the authoritative account cache that loads from,
//!   arbitrates between, and writes through to the registered plugins
//!
//! Concrete backends live in `presence-accounts-backends`.

pub mod codec;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use codec::{Codec, CodecError, KeyFile};
pub use error::{CoreError, CoreResult};
pub use services::{AccountRecord, AccountStorage};
pub use traits::{AccountManager, ParameterFlags, ProtocolIdentifier, StoragePlugin, TypedSet};
pub use types::{ObjectPath, Parameters, SimplePresence, Value, ValueType};

pub use tokio_util::sync::CancellationToken;
