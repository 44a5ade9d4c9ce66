//! Backend configuration and metadata types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backend type identifier.
///
/// Each variant is gated behind its corresponding feature flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Flat key-file. Requires feature `keyfile`.
    #[cfg(feature = "keyfile")]
    Keyfile,
    /// Typed in-process storage. Requires feature `memory`.
    #[cfg(feature = "memory")]
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "keyfile")]
            Self::Keyfile => write!(f, "keyfile"),
            #[cfg(feature = "memory")]
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Configuration for one backend instance.
///
/// Serialized as an adjacently tagged object:
///
/// ```json
/// { "backend": "memory", "options": { "name": "scratch", "priority": 100 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", content = "options")]
pub enum BackendConfig {
    #[cfg(feature = "keyfile")]
    #[serde(rename = "keyfile", rename_all = "camelCase")]
    Keyfile {
        path: PathBuf,
        #[serde(default = "default_list_separator")]
        list_separator: char,
    },

    #[cfg(feature = "memory")]
    #[serde(rename = "memory", rename_all = "camelCase")]
    Memory {
        name: String,
        #[serde(default = "default_memory_priority")]
        priority: i32,
        #[serde(default)]
        provider: Option<String>,
        #[serde(default)]
        refuse_create: bool,
    },
}

impl BackendConfig {
    pub fn backend_type(&self) -> BackendType {
        match self {
            #[cfg(feature = "keyfile")]
            Self::Keyfile { .. } => BackendType::Keyfile,
            #[cfg(feature = "memory")]
            Self::Memory { .. } => BackendType::Memory,
        }
    }
}

#[cfg(feature = "keyfile")]
fn default_list_separator() -> char {
    presence_accounts_core::codec::DEFAULT_LIST_SEPARATOR
}

#[cfg(feature = "memory")]
fn default_memory_priority() -> i32 {
    presence_accounts_core::traits::PRIORITY_NORMAL
}

/// Static description of a backend kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendMetadata {
    pub id: BackendType,
    pub name: String,
    pub description: String,
    /// Priority used unless the configuration overrides it.
    pub default_priority: i32,
    /// Provider id callers can name to create accounts here.
    pub provider: Option<String>,
    /// Whether the backend accepts typed writes.
    pub typed: bool,
}
