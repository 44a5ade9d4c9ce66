//! Type definitions

mod schema;
mod value;

pub use schema::{
    attribute_type, known_attributes, parameter_key, AccountKey, KEY_ALWAYS_DISPATCH,
    KEY_AUTOMATIC_PRESENCE, KEY_AUTO_PRESENCE_MESSAGE, KEY_AUTO_PRESENCE_STATUS,
    KEY_AUTO_PRESENCE_TYPE, KEY_AVATAR_MIME, KEY_AVATAR_TOKEN, KEY_CONNECT_AUTOMATICALLY,
    KEY_DISPLAY_NAME, KEY_ENABLED, KEY_HAS_BEEN_ONLINE, KEY_ICON, KEY_MANAGER, KEY_NICKNAME,
    KEY_NORMALIZED_NAME, KEY_PROTOCOL, KEY_SERVICE, KEY_SUPERSEDES, KEY_URI_SCHEMES,
    PARAMETER_PREFIX,
};
pub use value::{is_valid_object_path, ObjectPath, SimplePresence, Value, ValueType};

/// Connection parameters keyed by parameter name (no `param-` prefix).
pub type Parameters = std::collections::BTreeMap<String, Value>;
