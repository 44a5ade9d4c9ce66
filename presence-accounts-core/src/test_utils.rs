//! Test helpers
//!
//! Mock plugins and identifiers plus small factories for building an
//! orchestrator in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::services::AccountStorage;
use crate::traits::{AccountManager, ParameterFlags, ProtocolIdentifier, StoragePlugin, TypedSet};
use crate::types::{Parameters, Value, PARAMETER_PREFIX};

// ===== MockStoragePlugin =====

type Entries = BTreeMap<String, BTreeMap<String, String>>;
type TypedEntries = BTreeMap<String, BTreeMap<String, Value>>;

pub struct MockStoragePlugin {
    name: String,
    priority: i32,
    provider: Option<String>,
    typed_attributes: bool,
    typed_parameters: bool,
    can_create: bool,
    broken_list: bool,
    /// account -> flat key -> escaped value
    stored: RwLock<Entries>,
    /// account -> parameter -> value, pushed typed on load
    typed: RwLock<TypedEntries>,
    calls: RwLock<Vec<String>>,
}

impl MockStoragePlugin {
    pub fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            provider: None,
            typed_attributes: false,
            typed_parameters: false,
            can_create: true,
            broken_list: false,
            stored: RwLock::new(BTreeMap::new()),
            typed: RwLock::new(BTreeMap::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    pub fn with_typed_attributes(mut self) -> Self {
        self.typed_attributes = true;
        self
    }

    pub fn with_typed_parameters(mut self) -> Self {
        self.typed_parameters = true;
        self
    }

    pub fn refusing_create(mut self) -> Self {
        self.can_create = false;
        self
    }

    /// Make `list` fail, like a backend whose data cannot be read.
    pub fn with_broken_list(mut self) -> Self {
        self.broken_list = true;
        self
    }

    /// Seed an account with escaped flat key/value pairs.
    pub fn with_account(mut self, account: &str, entries: &[(&str, &str)]) -> Self {
        let group = self.stored.get_mut().entry(account.to_string()).or_default();
        for (key, value) in entries {
            group.insert((*key).to_string(), (*value).to_string());
        }
        self
    }

    /// Seed a parameter that is loaded through the typed path.
    pub fn with_typed_parameter(mut self, account: &str, parameter: &str, value: Value) -> Self {
        self.stored.get_mut().entry(account.to_string()).or_default();
        self.typed
            .get_mut()
            .entry(account.to_string())
            .or_default()
            .insert(parameter.to_string(), value);
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    pub async fn stored_value(&self, account: &str, key: &str) -> Option<String> {
        self.stored
            .read()
            .await
            .get(account)
            .and_then(|group| group.get(key))
            .cloned()
    }

    pub async fn has_account(&self, account: &str) -> bool {
        self.stored.read().await.contains_key(account)
    }

    async fn record(&self, call: String) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl StoragePlugin for MockStoragePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock storage"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    async fn list(&self, _manager: &dyn AccountManager) -> CoreResult<Vec<String>> {
        self.record("list".to_string()).await;
        if self.broken_list {
            return Err(CoreError::StorageError(format!("{} is unreadable", self.name)));
        }
        Ok(self.stored.read().await.keys().cloned().collect())
    }

    async fn get(
        &self,
        manager: &mut dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        self.record(format!("get {account}")).await;
        let entries = self.stored.read().await.get(account).cloned();
        let typed = self.typed.read().await.get(account).cloned();
        let Some(entries) = entries else {
            return Ok(false);
        };

        for (k, v) in &entries {
            if key.is_none_or(|wanted| wanted == k) {
                manager.set_value(account, k, Some(v));
            }
        }
        for (parameter, value) in typed.unwrap_or_default() {
            let flat = format!("{PARAMETER_PREFIX}{parameter}");
            if key.is_none_or(|wanted| wanted == flat) {
                manager.set_parameter(account, &parameter, Some(value), ParameterFlags::default());
            }
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
        self.record(format!("set {account} {key}={escaped}")).await;
        self.stored
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .insert(key.to_string(), escaped.to_string());
        Ok(true)
    }

    async fn set_attribute(
        &self,
        manager: &dyn AccountManager,
        account: &str,
        attribute: &str,
        value: &Value,
    ) -> CoreResult<TypedSet> {
        if !self.typed_attributes {
            return Ok(TypedSet::Unimplemented);
        }
        self.record(format!("set_attribute {account} {attribute}")).await;
        self.stored
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .insert(attribute.to_string(), manager.escape_value(value));
        Ok(TypedSet::Stored)
    }

    async fn set_parameter(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        parameter: &str,
        value: &Value,
        flags: ParameterFlags,
    ) -> CoreResult<TypedSet> {
        if !self.typed_parameters {
            return Ok(TypedSet::Unimplemented);
        }
        let suffix = if flags.secret { " secret" } else { "" };
        self.record(format!("set_parameter {account} {parameter}{suffix}"))
            .await;
        self.typed
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .insert(parameter.to_string(), value.clone());
        Ok(TypedSet::Stored)
    }

    async fn delete(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        self.record(format!("delete {account} {}", key.unwrap_or("*")))
            .await;
        let mut stored = self.stored.write().await;
        let mut typed = self.typed.write().await;
        match key {
            None => {
                stored.remove(account);
                typed.remove(account);
            }
            Some(key) => {
                if let Some(group) = stored.get_mut(account) {
                    group.remove(key);
                }
                if let (Some(parameter), Some(group)) =
                    (key.strip_prefix(PARAMETER_PREFIX), typed.get_mut(account))
                {
                    group.remove(parameter);
                }
            }
        }
        Ok(true)
    }

    async fn commit(
        &self,
        _manager: &dyn AccountManager,
        account: Option<&str>,
    ) -> CoreResult<bool> {
        self.record(format!("commit {}", account.unwrap_or("*"))).await;
        Ok(true)
    }

    async fn create(
        &self,
        manager: &dyn AccountManager,
        manager_name: &str,
        protocol: &str,
        identification: &str,
    ) -> CoreResult<Option<String>> {
        self.record(format!("create {manager_name}/{protocol}/{identification}"))
            .await;
        if !self.can_create {
            return Ok(None);
        }
        let account = manager.unique_name(manager_name, protocol, identification);
        self.stored
            .write()
            .await
            .insert(account.clone(), BTreeMap::new());
        Ok(Some(account))
    }

    async fn owns(&self, _manager: &dyn AccountManager, account: &str) -> bool {
        self.stored.read().await.contains_key(account)
    }
}

// ===== MockIdentifier =====

pub struct MockIdentifier {
    /// `None` never answers.
    result: Option<CoreResult<String>>,
    calls: AtomicUsize,
}

impl MockIdentifier {
    pub fn returning(result: CoreResult<String>) -> Self {
        Self {
            result: Some(result),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn pending() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolIdentifier for MockIdentifier {
    async fn identify_account(
        &self,
        _manager: &str,
        _protocol: &str,
        _parameters: &Parameters,
    ) -> CoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(result) => result.clone(),
            None => std::future::pending().await,
        }
    }
}

// ===== Factories =====

/// An orchestrator with `plugins` registered and nothing loaded.
pub fn storage_with(plugins: &[Arc<MockStoragePlugin>]) -> AccountStorage {
    let mut storage = AccountStorage::default();
    for plugin in plugins {
        storage.register_plugin(plugin.clone());
    }
    storage
}

pub fn params(entries: &[(&str, Value)]) -> Parameters {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
