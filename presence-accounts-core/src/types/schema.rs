//! Attribute schema and the flat key namespace.

use super::ValueType;

/// Prefix that marks a flat key as a connection parameter.
pub const PARAMETER_PREFIX: &str = "param-";

pub const KEY_AUTOMATIC_PRESENCE: &str = "AutomaticPresence";
pub const KEY_SUPERSEDES: &str = "Supersedes";
pub const KEY_URI_SCHEMES: &str = "URISchemes";
pub const KEY_ALWAYS_DISPATCH: &str = "always_dispatch";
pub const KEY_CONNECT_AUTOMATICALLY: &str = "ConnectAutomatically";
pub const KEY_ENABLED: &str = "Enabled";
pub const KEY_HAS_BEEN_ONLINE: &str = "HasBeenOnline";
pub const KEY_AUTO_PRESENCE_MESSAGE: &str = "AutomaticPresenceMessage";
pub const KEY_AUTO_PRESENCE_STATUS: &str = "AutomaticPresenceStatus";
pub const KEY_AVATAR_MIME: &str = "AvatarMime";
pub const KEY_AVATAR_TOKEN: &str = "avatar_token";
pub const KEY_DISPLAY_NAME: &str = "DisplayName";
pub const KEY_ICON: &str = "Icon";
pub const KEY_MANAGER: &str = "manager";
pub const KEY_NICKNAME: &str = "Nickname";
pub const KEY_NORMALIZED_NAME: &str = "NormalizedName";
pub const KEY_PROTOCOL: &str = "protocol";
pub const KEY_SERVICE: &str = "Service";
pub const KEY_AUTO_PRESENCE_TYPE: &str = "AutomaticPresenceType";

// Sorted by type, then by name.
const KNOWN_ATTRIBUTES: &[(&str, ValueType)] = &[
    (KEY_AUTOMATIC_PRESENCE, ValueType::SimplePresence),
    (KEY_SUPERSEDES, ValueType::ObjectPathArray),
    (KEY_URI_SCHEMES, ValueType::StringArray),
    (KEY_ALWAYS_DISPATCH, ValueType::Boolean),
    (KEY_CONNECT_AUTOMATICALLY, ValueType::Boolean),
    (KEY_ENABLED, ValueType::Boolean),
    (KEY_HAS_BEEN_ONLINE, ValueType::Boolean),
    (KEY_AUTO_PRESENCE_MESSAGE, ValueType::String),
    (KEY_AUTO_PRESENCE_STATUS, ValueType::String),
    (KEY_AVATAR_MIME, ValueType::String),
    (KEY_AVATAR_TOKEN, ValueType::String),
    (KEY_DISPLAY_NAME, ValueType::String),
    (KEY_ICON, ValueType::String),
    (KEY_MANAGER, ValueType::String),
    (KEY_NICKNAME, ValueType::String),
    (KEY_NORMALIZED_NAME, ValueType::String),
    (KEY_PROTOCOL, ValueType::String),
    (KEY_SERVICE, ValueType::String),
    (KEY_AUTO_PRESENCE_TYPE, ValueType::UInt32),
];

/// Fixed wire type of a known attribute, `None` for anything else.
#[must_use]
pub fn attribute_type(attribute: &str) -> Option<ValueType> {
    KNOWN_ATTRIBUTES
        .iter()
        .find(|(name, _)| *name == attribute)
        .map(|(_, ty)| *ty)
}

/// Names of every attribute in the schema.
pub fn known_attributes() -> impl Iterator<Item = &'static str> {
    KNOWN_ATTRIBUTES.iter().map(|(name, _)| *name)
}

/// A flat external key split into its attribute / parameter meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKey<'a> {
    Attribute(&'a str),
    /// Parameter name with the `param-` prefix stripped.
    Parameter(&'a str),
}

impl<'a> AccountKey<'a> {
    #[must_use]
    pub fn parse(key: &'a str) -> Self {
        match key.strip_prefix(PARAMETER_PREFIX) {
            Some(parameter) => Self::Parameter(parameter),
            None => Self::Attribute(key),
        }
    }
}

/// Flat key for a parameter name.
#[must_use]
pub fn parameter_key(parameter: &str) -> String {
    format!("{PARAMETER_PREFIX}{parameter}")
}
