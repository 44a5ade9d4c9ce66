//! Plugin-facing abstraction traits

mod account_manager;
mod protocol_identifier;
mod storage_plugin;

pub use account_manager::{AccountManager, ParameterFlags};
pub use protocol_identifier::ProtocolIdentifier;
pub use storage_plugin::{
    StoragePlugin, TypedSet, PRIORITY_DEFAULT, PRIORITY_KEYRING, PRIORITY_NORMAL,
};
