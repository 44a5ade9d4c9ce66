//! Cache entry for one account

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::traits::StoragePlugin;
use crate::types::Value;

/// Cached attributes and parameters of one account, bound to the plugin
/// that stores it.
///
/// A parameter lives either in the typed map or in the escaped map, never in
/// both; the mutators below keep it that way.
pub struct AccountRecord {
    attributes: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
    escaped_parameters: HashMap<String, String>,
    secrets: HashSet<String>,
    owner: Arc<dyn StoragePlugin>,
}

impl AccountRecord {
    pub(crate) fn new(owner: Arc<dyn StoragePlugin>) -> Self {
        Self {
            attributes: HashMap::new(),
            parameters: HashMap::new(),
            escaped_parameters: HashMap::new(),
            secrets: HashSet::new(),
            owner,
        }
    }

    pub fn owner(&self) -> &Arc<dyn StoragePlugin> {
        &self.owner
    }

    pub fn attribute(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn typed_parameter(&self, parameter: &str) -> Option<&Value> {
        self.parameters.get(parameter)
    }

    pub fn escaped_parameter(&self, parameter: &str) -> Option<&str> {
        self.escaped_parameters.get(parameter).map(String::as_str)
    }

    /// Parameter names from both representations.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .keys()
            .chain(self.escaped_parameters.keys())
            .map(String::as_str)
    }

    pub fn is_secret(&self, parameter: &str) -> bool {
        self.secrets.contains(parameter)
    }

    pub(crate) fn put_attribute(&mut self, attribute: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.attributes.insert(attribute.to_string(), value);
            }
            None => {
                self.attributes.remove(attribute);
            }
        }
    }

    pub(crate) fn put_parameter(&mut self, parameter: &str, value: Option<Value>) {
        self.escaped_parameters.remove(parameter);
        match value {
            Some(value) => {
                self.parameters.insert(parameter.to_string(), value);
            }
            None => {
                self.parameters.remove(parameter);
            }
        }
    }

    pub(crate) fn put_escaped_parameter(&mut self, parameter: &str, escaped: Option<&str>) {
        self.parameters.remove(parameter);
        match escaped {
            Some(escaped) => {
                self.escaped_parameters
                    .insert(parameter.to_string(), escaped.to_string());
            }
            None => {
                self.escaped_parameters.remove(parameter);
            }
        }
    }

    pub(crate) fn mark_secret(&mut self, parameter: &str) {
        self.secrets.insert(parameter.to_string());
    }
}

impl std::fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRecord")
            .field("owner", &self.owner.name())
            .field("attributes", &self.attributes)
            .field("parameters", &self.parameters)
            .field("escaped_parameters", &self.escaped_parameters)
            .finish_non_exhaustive()
    }
}
