//! Account cache and plugin orchestration

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use super::AccountRecord;
use crate::codec::{Codec, CodecError};
use crate::error::{CoreError, CoreResult};
use crate::traits::{AccountManager, ParameterFlags, ProtocolIdentifier, StoragePlugin, TypedSet};
use crate::types::{
    attribute_type, parameter_key, AccountKey, Value, ValueType, PARAMETER_PREFIX,
};
use crate::utils::escape_as_identifier;

/// Authoritative in-memory cache of every account, kept in sync with the
/// registered storage plugins.
///
/// Reads are served from the cache. Writes update the cache first and are
/// then pushed to the plugin that owns the account. Mutating operations take
/// `&mut self`, so there is exactly one writer.
pub struct AccountStorage {
    /// Descending priority; equal priorities keep registration order.
    pub(crate) plugins: Vec<Arc<dyn StoragePlugin>>,
    pub(crate) accounts: HashMap<String, AccountRecord>,
    pub(crate) codec: Codec,
    pub(crate) identifier: Option<Arc<dyn ProtocolIdentifier>>,
}

impl Default for AccountStorage {
    fn default() -> Self {
        Self::new(Codec::default())
    }
}

impl AccountStorage {
    #[must_use]
    pub fn new(codec: Codec) -> Self {
        Self {
            plugins: Vec::new(),
            accounts: HashMap::new(),
            codec,
            identifier: None,
        }
    }

    pub fn set_identifier(&mut self, identifier: Arc<dyn ProtocolIdentifier>) {
        self.identifier = Some(identifier);
    }

    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Add a plugin to the registry, keeping it sorted by priority.
    pub fn register_plugin(&mut self, plugin: Arc<dyn StoragePlugin>) {
        let priority = plugin.priority();
        let index = self
            .plugins
            .iter()
            .position(|p| p.priority() < priority)
            .unwrap_or(self.plugins.len());
        log::info!(
            "Registering storage plugin {} [prio: {priority}]",
            plugin.name()
        );
        self.plugins.insert(index, plugin);
    }

    /// Registered plugins, highest priority first.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn StoragePlugin>> {
        self.plugins.iter()
    }

    /// Populate the cache from every plugin, lowest priority first.
    ///
    /// A plugin that cannot list its accounts is logged and skipped. Fails
    /// with [`CoreError::AccountConflict`] if two plugins report the same
    /// account name.
    pub async fn load(&mut self) -> CoreResult<()> {
        let plugins = self.plugins.clone();

        for plugin in plugins.iter().rev() {
            let stored = match plugin.list(&*self).await {
                Ok(stored) => stored,
                Err(e) => {
                    log::error!("Plugin {} failed to list accounts: {e}", plugin.name());
                    continue;
                }
            };
            log::debug!(
                "listing from plugin {} [prio: {}]",
                plugin.name(),
                plugin.priority()
            );
            for account in stored {
                log::debug!("fetching {account} from plugin {}", plugin.name());
                self.add_account_from_plugin(plugin, &account).await?;
            }
        }

        log::info!("Loaded {} accounts", self.accounts.len());
        Ok(())
    }

    async fn add_account_from_plugin(
        &mut self,
        plugin: &Arc<dyn StoragePlugin>,
        account: &str,
    ) -> CoreResult<()> {
        if let Some(existing) = self.accounts.get(account) {
            let err = CoreError::AccountConflict {
                account: account.to_string(),
                existing: existing.owner().name().to_string(),
                claimed_by: plugin.name().to_string(),
            };
            log::error!("{err}");
            return Err(err);
        }

        self.accounts
            .insert(account.to_string(), AccountRecord::new(Arc::clone(plugin)));

        if let Err(e) = plugin.get(self, account, None).await {
            log::warn!("Plugin {} failed to load {account}: {e}", plugin.name());
        }
        Ok(())
    }

    /// Tell every plugin that registration and loading are complete.
    pub fn ready(&self) {
        for plugin in &self.plugins {
            log::debug!("Unblocking async account ops by {}", plugin.name());
            plugin.ready(self);
        }
    }

    // ===== Reads =====

    pub(crate) fn record(&self, account: &str) -> CoreResult<&AccountRecord> {
        self.accounts
            .get(account)
            .ok_or_else(|| CoreError::AccountNotFound(account.to_string()))
    }

    fn record_mut(&mut self, account: &str) -> CoreResult<&mut AccountRecord> {
        self.accounts
            .get_mut(account)
            .ok_or_else(|| CoreError::AccountNotFound(account.to_string()))
    }

    /// Names of accounts that hold at least one attribute, sorted.
    #[must_use]
    pub fn accounts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .accounts
            .iter()
            .filter(|(_, record)| record.has_attributes())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Attribute names stored for `account`, sorted.
    pub fn attributes(&self, account: &str) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .record(account)?
            .attribute_names()
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Name of the plugin that stores `account`.
    pub fn plugin_name(&self, account: &str) -> CoreResult<&str> {
        Ok(self.record(account)?.owner().name())
    }

    pub fn contains(&self, account: &str) -> bool {
        self.accounts.contains_key(account)
    }

    /// Ask the owning plugin whether it still stores `account`.
    pub async fn owns(&self, account: &str) -> bool {
        match self.accounts.get(account) {
            Some(record) => record.owner().owns(self, account).await,
            None => false,
        }
    }

    /// Read an attribute, converted to `ty` when given.
    pub fn get_attribute(
        &self,
        account: &str,
        attribute: &str,
        ty: Option<ValueType>,
    ) -> CoreResult<Value> {
        let value = self
            .record(account)?
            .attribute(attribute)
            .ok_or_else(|| not_stored(account, attribute))?;
        self.convert(value, ty)
    }

    /// Read a parameter, typed representation first, then the escaped one.
    ///
    /// Escaped parameters are decoded as `ty`, or as a string when no type is
    /// requested.
    pub fn get_parameter(
        &self,
        account: &str,
        parameter: &str,
        ty: Option<ValueType>,
    ) -> CoreResult<Value> {
        let record = self.record(account)?;

        if let Some(value) = record.typed_parameter(parameter) {
            return self.convert(value, ty);
        }
        if let Some(escaped) = record.escaped_parameter(parameter) {
            return Ok(self
                .codec
                .unescape(escaped, ty.unwrap_or(ValueType::String))?);
        }
        Err(not_stored(account, &parameter_key(parameter)))
    }

    fn convert(&self, value: &Value, ty: Option<ValueType>) -> CoreResult<Value> {
        match ty {
            Some(ty) => Ok(self.codec.coerce(value, ty)?),
            None => Ok(value.clone()),
        }
    }

    /// String attribute, `None` when unset or not representable as text.
    #[must_use]
    pub fn get_string(&self, account: &str, attribute: &str) -> Option<String> {
        match self.get_attribute(account, attribute, Some(ValueType::String)) {
            Ok(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Boolean attribute, `false` when unset.
    #[must_use]
    pub fn get_boolean(&self, account: &str, attribute: &str) -> bool {
        self.get_attribute(account, attribute, Some(ValueType::Boolean))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Unsigned attribute, `0` when unset.
    #[must_use]
    pub fn get_uint32(&self, account: &str, attribute: &str) -> u32 {
        self.get_attribute(account, attribute, Some(ValueType::UInt32))
            .ok()
            .and_then(|v| v.as_u32())
            .unwrap_or(0)
    }

    // ===== Writes =====

    /// Cache an attribute (or remove it with `None`) and push it to the
    /// owning plugin.
    ///
    /// The value is converted to the attribute's schema type first; only
    /// removal is allowed for names outside the schema. Returns `false` when
    /// the cache already held that value.
    pub async fn set_attribute(
        &mut self,
        account: &str,
        attribute: &str,
        value: Option<&Value>,
    ) -> CoreResult<bool> {
        if attribute.starts_with(PARAMETER_PREFIX) {
            return Err(CoreError::ValidationError(format!(
                "{attribute} is a parameter key, not an attribute"
            )));
        }

        let codec = self.codec;
        let new = match value {
            Some(v) => {
                let ty = attribute_type(attribute)
                    .ok_or_else(|| CoreError::UnknownAttribute(attribute.to_string()))?;
                Some(codec.coerce(v, ty)?)
            }
            None => None,
        };
        let record = self.record_mut(account)?;

        if record.attribute(attribute) == new.as_ref() {
            return Ok(false);
        }
        record.put_attribute(attribute, new.clone());

        let escaped = new.as_ref().map(|v| codec.escape(v));
        self.update_storage(
            account,
            attribute,
            new.as_ref(),
            escaped.as_deref(),
            ParameterFlags::default(),
        )
        .await;
        Ok(true)
    }

    /// Cache a parameter (or remove it with `None`) and push it to the
    /// owning plugin. `parameter` has no `param-` prefix.
    ///
    /// Compared against the typed value if one is cached, otherwise against
    /// the escaped text. Returns `false` when nothing changed.
    pub async fn set_parameter(
        &mut self,
        account: &str,
        parameter: &str,
        value: Option<&Value>,
    ) -> CoreResult<bool> {
        let codec = self.codec;
        let record = self.record_mut(account)?;
        let new_escaped = value.map(|v| codec.escape(v));

        let updated = if let Some(old) = record.typed_parameter(parameter) {
            Some(old) != value
        } else if let Some(old) = record.escaped_parameter(parameter) {
            Some(old) != new_escaped.as_deref()
        } else {
            value.is_some()
        };
        if !updated {
            return Ok(false);
        }

        record.put_parameter(parameter, value.cloned());
        let flags = ParameterFlags {
            secret: record.is_secret(parameter),
        };

        self.update_storage(
            account,
            &parameter_key(parameter),
            value,
            new_escaped.as_deref(),
            flags,
        )
        .await;
        Ok(true)
    }

    pub async fn set_string(
        &mut self,
        account: &str,
        attribute: &str,
        value: Option<&str>,
    ) -> CoreResult<bool> {
        let value = value.map(Value::from);
        self.set_attribute(account, attribute, value.as_ref()).await
    }

    /// Store a string list attribute; `None` stores the empty list.
    pub async fn set_strv(
        &mut self,
        account: &str,
        attribute: &str,
        value: Option<&[String]>,
    ) -> CoreResult<bool> {
        let value = Value::StringArray(value.map(<[String]>::to_vec).unwrap_or_default());
        self.set_attribute(account, attribute, Some(&value)).await
    }

    /// Push one flat key to the owning plugin: delete, typed set, or
    /// escaped set, in that order of preference.
    ///
    /// Plugin failures are logged and otherwise ignored; the cache stays
    /// authoritative.
    async fn update_storage(
        &self,
        account: &str,
        key: &str,
        value: Option<&Value>,
        escaped: Option<&str>,
        flags: ParameterFlags,
    ) {
        let Some(record) = self.accounts.get(account) else {
            return;
        };
        let plugin = Arc::clone(record.owner());
        let pn = plugin.name();

        let Some(escaped) = escaped else {
            log::debug!("{pn} -> delete {account}.{key}");
            if let Err(e) = plugin.delete(self, account, Some(key)).await {
                log::error!("{pn} failed to delete {account}.{key}: {e}");
            }
            return;
        };

        if let Some(value) = value {
            let (typed, kind) = match AccountKey::parse(key) {
                AccountKey::Attribute(attribute) => (
                    plugin.set_attribute(self, account, attribute, value).await,
                    "attribute",
                ),
                AccountKey::Parameter(parameter) => (
                    plugin
                        .set_parameter(self, account, parameter, value, flags)
                        .await,
                    "parameter",
                ),
            };
            match typed {
                Ok(TypedSet::Stored) => {
                    log::debug!("{pn} -> store {kind} {account}.{key}");
                    return;
                }
                Ok(TypedSet::Unimplemented) => {}
                Err(e) => {
                    log::error!("{pn} failed to store {kind} {account}.{key}: {e}");
                    return;
                }
            }
        }

        match plugin.set(self, account, key, escaped).await {
            Ok(done) => log::debug!(
                "{pn} -> {} {account}.{key}",
                if done { "store" } else { "ignore" }
            ),
            Err(e) => log::error!("{pn} failed to store {account}.{key}: {e}"),
        }
    }

    // ===== Lifecycle =====

    /// Create a new, empty account.
    ///
    /// With a `provider`, only the plugin declaring that provider id is asked.
    /// Otherwise plugins are asked in priority order until one accepts.
    /// Nothing is persisted until [`commit`](Self::commit).
    pub async fn create_account(
        &mut self,
        provider: Option<&str>,
        manager: &str,
        protocol: &str,
        identification: &str,
    ) -> CoreResult<String> {
        if manager.is_empty() || protocol.is_empty() {
            return Err(CoreError::ValidationError(
                "manager and protocol must not be empty".to_string(),
            ));
        }
        let plugins = self.plugins.clone();

        if let Some(provider) = provider {
            let plugin = plugins
                .iter()
                .find(|p| p.provider() == Some(provider))
                .ok_or_else(|| CoreError::StorageProviderNotFound(provider.to_string()))?;

            let account = plugin
                .create(&*self, manager, protocol, identification)
                .await?
                .ok_or_else(|| {
                    CoreError::StorageError(format!(
                        "{} declined to create the account",
                        plugin.name()
                    ))
                })?;
            self.add_account_from_plugin(plugin, &account).await?;
            return Ok(account);
        }

        for plugin in &plugins {
            match plugin
                .create(&*self, manager, protocol, identification)
                .await
            {
                Ok(Some(account)) => {
                    log::info!("Created account {account} in {}", plugin.name());
                    self.add_account_from_plugin(plugin, &account).await?;
                    return Ok(account);
                }
                Ok(None) => log::debug!("{} cannot create this account", plugin.name()),
                Err(e) => log::debug!("{} failed to create this account: {e}", plugin.name()),
            }
        }

        let err = CoreError::NoStorageAvailable;
        log::error!("{err}");
        Err(err)
    }

    /// Delete an account from its plugin and drop it from the cache.
    ///
    /// The cache entry is removed even if the plugin reports a failure.
    pub async fn delete_account(&mut self, account: &str) -> CoreResult<()> {
        let plugin = Arc::clone(self.record(account)?.owner());

        match plugin.delete(&*self, account, None).await {
            Ok(_) => log::info!("Deleted account {account} from {}", plugin.name()),
            Err(e) => log::error!("{} failed to delete {account}: {e}", plugin.name()),
        }
        self.accounts.remove(account);
        Ok(())
    }

    /// Flush one account to its plugin, or every plugin when `account` is
    /// `None`.
    ///
    /// An account that is no longer cached (e.g. just deleted) is a no-op;
    /// use `commit(None)` to flush a deletion. Plugins that decline or fail
    /// are logged and never retried.
    pub async fn commit(&self, account: Option<&str>) -> CoreResult<()> {
        if let Some(account) = account {
            let Some(record) = self.accounts.get(account) else {
                log::warn!("Not committing unknown account {account}");
                return Ok(());
            };
            let plugin = record.owner();
            log::debug!(
                "flushing plugin {} {account} to long term storage",
                plugin.name()
            );
            log_commit(plugin.name(), plugin.commit(self, Some(account)).await);
            return Ok(());
        }

        let results = join_all(self.plugins.iter().map(|plugin| async move {
            log::debug!("flushing plugin {} to long term storage", plugin.name());
            (plugin.name(), plugin.commit(self, None).await)
        }))
        .await;

        for (name, result) in results {
            log_commit(name, result);
        }
        Ok(())
    }
}

fn not_stored(account: &str, key: &str) -> CoreError {
    CoreError::NotStored {
        account: account.to_string(),
        key: key.to_string(),
    }
}

fn log_commit(plugin: &str, result: CoreResult<bool>) {
    match result {
        Ok(true) => {}
        Ok(false) => log::warn!("{plugin} declined to commit"),
        Err(e) => log::error!("{plugin} failed to commit: {e}"),
    }
}

impl AccountManager for AccountStorage {
    fn get_value(&self, account: &str, key: &str) -> Option<String> {
        let record = self.accounts.get(account)?;
        match AccountKey::parse(key) {
            AccountKey::Attribute(attribute) => record
                .attribute(attribute)
                .map(|v| self.codec.escape(v)),
            AccountKey::Parameter(parameter) => match record.typed_parameter(parameter) {
                Some(v) => Some(self.codec.escape(v)),
                None => record.escaped_parameter(parameter).map(str::to_string),
            },
        }
    }

    fn set_value(&mut self, account: &str, key: &str, value: Option<&str>) {
        let codec = self.codec;
        let Some(record) = self.accounts.get_mut(account) else {
            log::warn!("Ignoring {key} for unknown account {account}");
            return;
        };

        match AccountKey::parse(key) {
            AccountKey::Parameter(parameter) => record.put_escaped_parameter(parameter, value),
            AccountKey::Attribute(attribute) => {
                let Some(escaped) = value else {
                    record.put_attribute(attribute, None);
                    return;
                };
                let ty = attribute_type(attribute).unwrap_or_else(|| {
                    log::warn!("Not sure what the type of '{attribute}' is, assuming string");
                    ValueType::String
                });
                match codec.unescape(escaped, ty) {
                    Ok(decoded) => record.put_attribute(attribute, Some(decoded)),
                    Err(e) => {
                        log::warn!(
                            "Could not decode attribute '{attribute}':'{escaped}' from plugin: {e}"
                        );
                        record.put_attribute(attribute, None);
                    }
                }
            }
        }
    }

    fn set_attribute(&mut self, account: &str, attribute: &str, value: Option<Value>) {
        let codec = self.codec;
        let Some(record) = self.accounts.get_mut(account) else {
            log::warn!("Ignoring {attribute} for unknown account {account}");
            return;
        };

        let value = match (value, attribute_type(attribute)) {
            (Some(v), Some(ty)) => match codec.coerce(&v, ty) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("Could not convert attribute '{attribute}' from plugin: {e}");
                    None
                }
            },
            (value, _) => value,
        };
        record.put_attribute(attribute, value);
    }

    fn set_parameter(
        &mut self,
        account: &str,
        parameter: &str,
        value: Option<Value>,
        flags: ParameterFlags,
    ) {
        let Some(record) = self.accounts.get_mut(account) else {
            log::warn!("Ignoring parameter {parameter} for unknown account {account}");
            return;
        };
        record.put_parameter(parameter, value);
        if flags.secret {
            record.mark_secret(parameter);
        }
    }

    fn list_keys(&self, account: &str) -> Vec<String> {
        let Some(record) = self.accounts.get(account) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = record
            .attribute_names()
            .map(str::to_string)
            .chain(record.parameter_names().map(parameter_key))
            .collect();
        keys.sort();
        keys
    }

    fn escape_value(&self, value: &Value) -> String {
        self.codec.escape(value)
    }

    fn unescape_value(&self, escaped: &str, ty: ValueType) -> Result<Value, CodecError> {
        self.codec.unescape(escaped, ty)
    }

    fn init_value_for_attribute(&self, attribute: &str) -> Option<ValueType> {
        attribute_type(attribute)
    }

    fn unique_name(&self, manager: &str, protocol: &str, identification: &str) -> String {
        let esc_manager = escape_as_identifier(manager);
        let esc_protocol = protocol.replace('-', "_");
        let esc_base = escape_as_identifier(identification);

        let mut n: u64 = 0;
        loop {
            let candidate = format!("{esc_manager}/{esc_protocol}/{esc_base}{n}");
            if !self.accounts.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn parameter_make_secret(&mut self, account: &str, parameter: &str) {
        if let Some(record) = self.accounts.get_mut(account) {
            record.mark_secret(parameter);
        }
    }

    fn parameter_is_secret(&self, account: &str, parameter: &str) -> bool {
        self.accounts
            .get(account)
            .is_some_and(|record| record.is_secret(parameter))
    }
}
