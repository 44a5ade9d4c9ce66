//! Storage configuration loaded from a JSON file.

use std::path::{Path, PathBuf};

use presence_accounts_backends::BackendConfig;
use presence_accounts_core::codec::DEFAULT_LIST_SEPARATOR;
use presence_accounts_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const ENV_CONFIG: &str = "PRESENCE_ACCOUNTS_CONFIG";

const APP_DIR: &str = "presence-accounts";
const KEYFILE_NAME: &str = "accounts.cfg";

/// Separators that would break the `key=value` line format.
const FORBIDDEN_SEPARATORS: [char; 5] = ['\n', '\r', '\\', '=', ' '];

/// Which backends to register and how the key-file is encoded.
///
/// ```json
/// {
///   "keyfilePath": "/home/me/.local/share/presence-accounts/accounts.cfg",
///   "listSeparator": ",",
///   "extraBackends": [{ "backend": "memory", "options": { "name": "scratch" } }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub keyfile_path: PathBuf,
    pub list_separator: char,
    pub extra_backends: Vec<BackendConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            keyfile_path: default_keyfile_path(),
            list_separator: DEFAULT_LIST_SEPARATOR,
            extra_backends: Vec::new(),
        }
    }
}

impl StorageConfig {
    /// Read the configuration at `path`. A missing file yields the defaults.
    pub async fn load(path: &Path) -> CoreResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(CoreError::StorageError(format!(
                    "Failed to read config {}: {e}",
                    path.display()
                )))
            }
        };

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            CoreError::ValidationError(format!("Invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if FORBIDDEN_SEPARATORS.contains(&self.list_separator) {
            return Err(CoreError::ValidationError(format!(
                "{:?} cannot be used as list separator",
                self.list_separator
            )));
        }
        if self.keyfile_path.as_os_str().is_empty() {
            return Err(CoreError::ValidationError(
                "keyfilePath must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_keyfile_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(KEYFILE_NAME)
}
