//! Storage backend plugin Trait

use async_trait::async_trait;

use super::{AccountManager, ParameterFlags};
use crate::error::CoreResult;
use crate::types::Value;

/// Priority of the built-in flat-file backend.
pub const PRIORITY_DEFAULT: i32 = 0;
/// Priority of ordinary third-party backends.
pub const PRIORITY_NORMAL: i32 = 100;
/// Priority of backends that should win over everything else.
pub const PRIORITY_KEYRING: i32 = 10000;

/// Outcome of a typed write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedSet {
    /// The plugin took the value.
    Stored,
    /// The plugin has no typed path for this call; use [`StoragePlugin::set`].
    Unimplemented,
}

/// Long-term storage backend
///
/// Every call receives the account manager so the plugin can read cached
/// values, escape values, or (in [`get`](Self::get)) push data into the
/// cache.
///
/// Implementations:
/// - `KeyfileStorage`: the default flat-file backend, always able to create
/// - `InMemoryStorage`: typed in-process backend
#[async_trait]
pub trait StoragePlugin: Send + Sync {
    /// Short unique plugin name, used in logs.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Higher priority is preferred when creating accounts.
    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    /// Provider id callers may name to pick this plugin explicitly.
    fn provider(&self) -> Option<&str> {
        None
    }

    /// Names of every account this plugin stores
    async fn list(&self, manager: &dyn AccountManager) -> CoreResult<Vec<String>>;

    /// Push stored data for `account` into the cache
    ///
    /// # Arguments
    /// * `account` - Account name
    /// * `key` - Single flat key to refresh, `None` for everything
    async fn get(
        &self,
        manager: &mut dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool>;

    /// Store an escaped value. Returns `false` if the plugin ignored it.
    async fn set(
        &self,
        manager: &dyn AccountManager,
        account: &str,
        key: &str,
        escaped: &str,
    ) -> CoreResult<bool>;

    /// Store a typed attribute
    async fn set_attribute(
        &self,
        _manager: &dyn AccountManager,
        _account: &str,
        _attribute: &str,
        _value: &Value,
    ) -> CoreResult<TypedSet> {
        Ok(TypedSet::Unimplemented)
    }

    /// Store a typed parameter, `parameter` without the `param-` prefix
    async fn set_parameter(
        &self,
        _manager: &dyn AccountManager,
        _account: &str,
        _parameter: &str,
        _value: &Value,
        _flags: ParameterFlags,
    ) -> CoreResult<TypedSet> {
        Ok(TypedSet::Unimplemented)
    }

    /// Delete one flat key, or the whole account when `key` is `None`
    async fn delete(
        &self,
        manager: &dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool>;

    /// Flush one account, or everything when `account` is `None`
    async fn commit(&self, manager: &dyn AccountManager, account: Option<&str>)
        -> CoreResult<bool>;

    /// Allocate and store a new account. `Ok(None)` means this plugin cannot
    /// hold it and the next plugin should be asked.
    async fn create(
        &self,
        _manager: &dyn AccountManager,
        _manager_name: &str,
        _protocol: &str,
        _identification: &str,
    ) -> CoreResult<Option<String>> {
        Ok(None)
    }

    /// Called once every plugin is registered and loaded.
    fn ready(&self, _manager: &dyn AccountManager) {}

    /// Whether `account` is stored by this plugin
    async fn owns(&self, manager: &dyn AccountManager, account: &str) -> bool;
}
