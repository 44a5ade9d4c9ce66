//! Write-back interface handed to storage plugins

use crate::codec::CodecError;
use crate::types::{Value, ValueType};

/// Per-write flags for typed parameter storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParameterFlags {
    /// The parameter holds a credential and belongs in a secret store.
    pub secret: bool,
}

/// The narrow view of the account cache that plugins may use.
///
/// Plugins push loaded data into the cache through the `&mut self` methods
/// while answering [`StoragePlugin::get`](super::StoragePlugin::get). These
/// writes only touch the cache; they are never dispatched back to a plugin.
///
/// Keys are flat: attribute names as-is, parameters with the `param-` prefix.
pub trait AccountManager: Send + Sync {
    /// Escaped form of a cached value, `None` when unset.
    fn get_value(&self, account: &str, key: &str) -> Option<String>;

    /// Store an escaped value (or remove it with `None`).
    ///
    /// Attributes are decoded according to the schema; undecodable data is
    /// dropped with a warning. Parameters are kept escaped until a caller
    /// asks for them with a type.
    fn set_value(&mut self, account: &str, key: &str, value: Option<&str>);

    /// Store a typed attribute (or remove it with `None`).
    fn set_attribute(&mut self, account: &str, attribute: &str, value: Option<Value>);

    /// Store a typed parameter (or remove it with `None`). `parameter` has no
    /// `param-` prefix.
    fn set_parameter(
        &mut self,
        account: &str,
        parameter: &str,
        value: Option<Value>,
        flags: ParameterFlags,
    );

    /// Every flat key stored for `account`, parameters prefixed.
    fn list_keys(&self, account: &str) -> Vec<String>;

    fn escape_value(&self, value: &Value) -> String;

    fn unescape_value(&self, escaped: &str, ty: ValueType) -> Result<Value, CodecError>;

    /// Schema type of `attribute`, `None` if it is not a known attribute.
    fn init_value_for_attribute(&self, attribute: &str) -> Option<ValueType>;

    /// An account name not yet used by any cached account, of the form
    /// `<manager>/<protocol>/<identification><n>` with every component
    /// escaped to identifier characters.
    fn unique_name(&self, manager: &str, protocol: &str, identification: &str) -> String;

    fn parameter_make_secret(&mut self, account: &str, parameter: &str);

    fn parameter_is_secret(&self, account: &str, parameter: &str) -> bool;
}
