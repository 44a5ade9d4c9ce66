//! Key-file account storage

mod io;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use presence_accounts_core::traits::PRIORITY_DEFAULT;
use presence_accounts_core::{AccountManager, CoreError, CoreResult, KeyFile, StoragePlugin};

use crate::types::{BackendMetadata, BackendType};

/// Provider id of the built-in key-file backend.
pub const KEYFILE_PROVIDER: &str = "im.telepathy.Account.Storage.Keyfile";

const NAME: &str = "keyfile";
const DESCRIPTION: &str = "Key-file account storage";

struct State {
    file: KeyFile,
    loaded: bool,
    dirty: bool,
}

/// The default backend: every account is one group of a single key-file,
/// values stored in their escaped form.
///
/// Only untyped writes are supported. The file is read on first use and
/// rewritten as a whole on commit.
pub struct KeyfileStorage {
    path: PathBuf,
    state: RwLock<State>,
}

impl KeyfileStorage {
    pub fn new(path: impl Into<PathBuf>, list_separator: char) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(State {
                file: KeyFile::new(list_separator),
                loaded: false,
                dirty: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata() -> BackendMetadata {
        BackendMetadata {
            id: BackendType::Keyfile,
            name: NAME.to_string(),
            description: DESCRIPTION.to_string(),
            default_priority: PRIORITY_DEFAULT,
            provider: Some(KEYFILE_PROVIDER.to_string()),
            typed: false,
        }
    }

    async fn ensure_loaded(&self, state: &mut State) -> CoreResult<()> {
        if state.loaded {
            return Ok(());
        }
        let separator = state.file.separator();
        state.file = io::read_keyfile(&self.path, separator).await?;
        state.loaded = true;
        log::debug!(
            "Loaded {} account groups from {}",
            state.file.groups().count(),
            self.path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl StoragePlugin for KeyfileStorage {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    fn provider(&self) -> Option<&str> {
        Some(KEYFILE_PROVIDER)
    }

    async fn list(&self, _manager: &dyn AccountManager) -> CoreResult<Vec<String>> {
        let mut state = self.state.write().await;
        self.ensure_loaded(&mut state).await?;
        Ok(state.file.groups().map(str::to_string).collect())
    }

    async fn get(
        &self,
        manager: &mut dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        self.ensure_loaded(&mut state).await?;

        if !state.file.has_group(account) {
            return Ok(false);
        }
        if let Some(key) = key {
            manager.set_value(account, key, state.file.get_value(account, key));
            return Ok(true);
        }
        for k in state.file.keys(account) {
            manager.set_value(account, k, state.file.get_value(account, k));
        }
        Ok(true)
    }

    async fn set(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        key: &str,
        escaped: &str,
    ) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        self.ensure_loaded(&mut state).await?;

        if state.file.set_value(account, key, escaped)? {
            state.dirty = true;
        }
        Ok(true)
    }

    async fn delete(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        self.ensure_loaded(&mut state).await?;

        let removed = match key {
            Some(key) => state.file.remove_key(account, key),
            None => state.file.remove_group(account),
        };
        state.dirty |= removed;
        Ok(true)
    }

    async fn commit(
        &self,
        _manager: &dyn AccountManager,
        _account: Option<&str>,
    ) -> CoreResult<bool> {
        let mut state = self.state.write().await;
        if !state.loaded || !state.dirty {
            return Ok(true);
        }

        io::write_keyfile(&self.path, &state.file).await?;
        state.dirty = false;
        log::info!("Saved accounts to {}", self.path.display());
        Ok(true)
    }

    async fn create(
        &self,
        manager: &dyn AccountManager,
        manager_name: &str,
        protocol: &str,
        identification: &str,
    ) -> CoreResult<Option<String>> {
        let mut state = self.state.write().await;
        self.ensure_loaded(&mut state).await?;

        let account = manager.unique_name(manager_name, protocol, identification);
        if !state.file.add_group(&account)? {
            return Err(CoreError::StorageError(format!(
                "{account} already exists in {}",
                self.path.display()
            )));
        }
        state.dirty = true;
        Ok(Some(account))
    }

    fn ready(&self, _manager: &dyn AccountManager) {
        log::debug!("{NAME} storage ready ({})", self.path.display());
    }

    async fn owns(&self, _manager: &dyn AccountManager, account: &str) -> bool {
        self.state.read().await.file.has_group(account)
    }
}
