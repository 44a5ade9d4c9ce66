//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

pub use crate::codec::CodecError;

/// Core layer error type
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No account with this name is cached
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// The account exists but holds no value for the key
    #[error("{key} is not stored for account {account}")]
    NotStored { account: String, key: String },

    /// Attribute name outside the fixed schema
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Value could not be escaped, decoded or coerced
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// No registered plugin declares this provider id
    #[error("Storage provider '{0}' does not exist")]
    StorageProviderNotFound(String),

    /// The callee does not implement the operation
    #[error("Operation not implemented: {0}")]
    NotImplemented(String),

    /// The callee is not currently reachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Backend I/O or RPC failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Every plugin declined to create the account
    #[error("None of the storage providers are able to create the account")]
    NoStorageAvailable,

    /// Two plugins claim the same account name
    #[error("Account {account} is already owned by {existing}, also claimed by {claimed_by}")]
    AccountConflict {
        account: String,
        existing: String,
        claimed_by: String,
    },

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Whether it is expected behavior (user input, value does not exist, etc.), used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::AccountNotFound(_)
            | Self::NotStored { .. }
            | Self::UnknownAttribute(_)
            | Self::Codec(_)
            | Self::StorageProviderNotFound(_)
            | Self::NotImplemented(_)
            | Self::Cancelled
            | Self::ValidationError(_) => true,
            Self::ServiceUnavailable(_)
            | Self::StorageError(_)
            | Self::NoStorageAvailable
            | Self::AccountConflict { .. } => false,
        }
    }

    /// Invariant violations that leave the cache in an unusable state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AccountConflict { .. } | Self::NoStorageAvailable)
    }

    /// Errors after which identification degrades to the raw `account`
    /// parameter instead of failing.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::NotImplemented(_) | Self::ServiceUnavailable(_))
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
