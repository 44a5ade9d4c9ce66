//! In-process typed account storage

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use presence_accounts_core::traits::PRIORITY_NORMAL;
use presence_accounts_core::types::{parameter_key, AccountKey, ValueType};
use presence_accounts_core::{
    AccountManager, CoreResult, ParameterFlags, StoragePlugin, TypedSet, Value,
};

use crate::types::{BackendMetadata, BackendType};

#[derive(Debug, Clone, Default, PartialEq)]
struct StoredAccount {
    attributes: BTreeMap<String, Value>,
    parameters: BTreeMap<String, Value>,
    escaped_parameters: BTreeMap<String, String>,
    secrets: BTreeSet<String>,
}

/// Typed backend that keeps accounts in process memory.
///
/// Accepts typed attributes and parameters. Nothing survives a restart;
/// commits are only counted.
pub struct InMemoryStorage {
    name: String,
    priority: i32,
    provider: Option<String>,
    can_create: bool,
    accounts: RwLock<HashMap<String, StoredAccount>>,
    commits: RwLock<Vec<Option<String>>>,
}

impl InMemoryStorage {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            provider: None,
            can_create: true,
            accounts: RwLock::new(HashMap::new()),
            commits: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Make [`create`](StoragePlugin::create) decline every account.
    #[must_use]
    pub fn refusing_create(mut self) -> Self {
        self.can_create = false;
        self
    }

    /// Seed an account with an attribute, as if loaded from elsewhere.
    #[must_use]
    pub fn with_attribute(mut self, account: &str, attribute: &str, value: Value) -> Self {
        self.accounts
            .get_mut()
            .entry(account.to_string())
            .or_default()
            .attributes
            .insert(attribute.to_string(), value);
        self
    }

    pub fn metadata() -> BackendMetadata {
        BackendMetadata {
            id: BackendType::Memory,
            name: "memory".to_string(),
            description: "Typed in-process account storage".to_string(),
            default_priority: PRIORITY_NORMAL,
            provider: None,
            typed: true,
        }
    }

    /// Accounts named in each commit so far, `None` for commit-all.
    pub async fn commits(&self) -> Vec<Option<String>> {
        self.commits.read().await.clone()
    }

    pub async fn attribute(&self, account: &str, attribute: &str) -> Option<Value> {
        self.accounts
            .read()
            .await
            .get(account)
            .and_then(|a| a.attributes.get(attribute))
            .cloned()
    }

    pub async fn parameter(&self, account: &str, parameter: &str) -> Option<Value> {
        self.accounts
            .read()
            .await
            .get(account)
            .and_then(|a| a.parameters.get(parameter))
            .cloned()
    }

    pub async fn is_secret(&self, account: &str, parameter: &str) -> bool {
        self.accounts
            .read()
            .await
            .get(account)
            .is_some_and(|a| a.secrets.contains(parameter))
    }
}

#[async_trait]
impl StoragePlugin for InMemoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Typed in-process account storage"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    async fn list(&self, _manager: &dyn AccountManager) -> CoreResult<Vec<String>> {
        Ok(self.accounts.read().await.keys().cloned().collect())
    }

    async fn get(
        &self,
        manager: &mut dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        let Some(stored) = self.accounts.read().await.get(account).cloned() else {
            return Ok(false);
        };

        for (attribute, value) in stored.attributes {
            if key.is_none_or(|k| k == attribute) {
                manager.set_attribute(account, &attribute, Some(value));
            }
        }
        for (parameter, value) in stored.parameters {
            if key.is_none_or(|k| AccountKey::parse(k) == AccountKey::Parameter(&parameter)) {
                let flags = ParameterFlags {
                    secret: stored.secrets.contains(&parameter),
                };
                manager.set_parameter(account, &parameter, Some(value), flags);
            }
        }
        for (parameter, escaped) in stored.escaped_parameters {
            if key.is_none_or(|k| AccountKey::parse(k) == AccountKey::Parameter(&parameter)) {
                manager.set_value(
                    account,
                    &parameter_key(&parameter),
                    Some(&escaped),
                );
            }
        }
        Ok(true)
    }

    async fn set(
        &self,
        manager: &dyn AccountManager,
        account: &str,
        key: &str,
        escaped: &str,
    ) -> CoreResult<bool> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts.entry(account.to_string()).or_default();

        match AccountKey::parse(key) {
            AccountKey::Parameter(parameter) => {
                stored.parameters.remove(parameter);
                stored
                    .escaped_parameters
                    .insert(parameter.to_string(), escaped.to_string());
            }
            AccountKey::Attribute(attribute) => {
                let ty = manager
                    .init_value_for_attribute(attribute)
                    .unwrap_or(ValueType::String);
                let value = manager.unescape_value(escaped, ty)?;
                stored.attributes.insert(attribute.to_string(), value);
            }
        }
        Ok(true)
    }

    async fn set_attribute(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        attribute: &str,
        value: &Value,
    ) -> CoreResult<TypedSet> {
        self.accounts
            .write()
            .await
            .entry(account.to_string())
            .or_default()
            .attributes
            .insert(attribute.to_string(), value.clone());
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
        let mut accounts = self.accounts.write().await;
        let stored = accounts.entry(account.to_string()).or_default();
        stored.escaped_parameters.remove(parameter);
        stored
            .parameters
            .insert(parameter.to_string(), value.clone());
        if flags.secret {
            stored.secrets.insert(parameter.to_string());
        }
        Ok(TypedSet::Stored)
    }

    async fn delete(
        &self,
        _manager: &dyn AccountManager,
        account: &str,
        key: Option<&str>,
    ) -> CoreResult<bool> {
        let mut accounts = self.accounts.write().await;
        let Some(key) = key else {
            return Ok(accounts.remove(account).is_some());
        };
        let Some(stored) = accounts.get_mut(account) else {
            return Ok(false);
        };
        let removed = match AccountKey::parse(key) {
            AccountKey::Parameter(parameter) => {
                stored.secrets.remove(parameter);
                stored.parameters.remove(parameter).is_some()
                    | stored.escaped_parameters.remove(parameter).is_some()
            }
            AccountKey::Attribute(attribute) => stored.attributes.remove(attribute).is_some(),
        };
        Ok(removed)
    }

    async fn commit(
        &self,
        _manager: &dyn AccountManager,
        account: Option<&str>,
    ) -> CoreResult<bool> {
        self.commits.write().await.push(account.map(str::to_string));
        Ok(true)
    }

    async fn create(
        &self,
        manager: &dyn AccountManager,
        manager_name: &str,
        protocol: &str,
        identification: &str,
    ) -> CoreResult<Option<String>> {
        if !self.can_create {
            return Ok(None);
        }
        let account = manager.unique_name(manager_name, protocol, identification);
        self.accounts
            .write()
            .await
            .insert(account.clone(), StoredAccount::default());
        Ok(Some(account))
    }

    async fn owns(&self, _manager: &dyn AccountManager, account: &str) -> bool {
        self.accounts.read().await.contains_key(account)
    }
}
