//! In-memory model of a grouped `key=value` file.
//!
//! Values are held in their escaped form; [`KeyFile::set_typed`] and
//! [`KeyFile::get_typed`] go through the [`Codec`]. Comments and blank lines
//! are not preserved on rewrite.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{Codec, CodecError, DEFAULT_LIST_SEPARATOR};
use crate::types::{Value, ValueType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFile {
    separator: char,
    groups: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for KeyFile {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_SEPARATOR)
    }
}

impl KeyFile {
    #[must_use]
    pub fn new(separator: char) -> Self {
        Self {
            separator,
            groups: BTreeMap::new(),
        }
    }

    /// Parse key-file text.
    ///
    /// Lines starting with `#` and blank lines are skipped. A key line before
    /// the first `[group]` header is a syntax error.
    pub fn parse(data: &str, separator: char) -> Result<Self, CodecError> {
        let mut file = Self::new(separator);
        let mut current: Option<String> = None;

        for (idx, raw) in data.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .trim_end()
                    .strip_suffix(']')
                    .ok_or_else(|| syntax(line_no, "unterminated group header"))?;
                if !is_valid_group_name(name) {
                    return Err(syntax(line_no, &format!("invalid group name {name:?}")));
                }
                file.groups.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let Some(group) = current.as_ref() else {
                return Err(syntax(line_no, "key outside of any group"));
            };
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| syntax(line_no, "expected key=value"))?;
            let key = key.trim_end();
            if !is_valid_key_name(key) {
                return Err(syntax(line_no, &format!("invalid key name {key:?}")));
            }
            file.groups
                .entry(group.clone())
                .or_default()
                .insert(key.to_string(), value.trim_start().to_string());
        }

        Ok(file)
    }

    /// Serialize back to key-file text, one blank line between groups.
    #[must_use]
    pub fn to_data(&self) -> String {
        let mut out = String::new();
        for (i, (group, entries)) in self.groups.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "[{group}]");
            for (key, value) in entries {
                let _ = writeln!(out, "{key}={value}");
            }
        }
        out
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    #[must_use]
    pub fn codec(&self) -> Codec {
        Codec::new(self.separator)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Keys of `group`, empty when the group does not exist.
    pub fn keys<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.groups
            .get(group)
            .into_iter()
            .flat_map(|entries| entries.keys().map(String::as_str))
    }

    #[must_use]
    pub fn get_value(&self, group: &str, key: &str) -> Option<&str> {
        self.groups
            .get(group)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Store an already-escaped value. Returns whether the file changed.
    pub fn set_value(&mut self, group: &str, key: &str, escaped: &str) -> Result<bool, CodecError> {
        if !is_valid_group_name(group) {
            return Err(CodecError::InvalidName(group.to_string()));
        }
        if !is_valid_key_name(key) || escaped.contains(['\n', '\r']) {
            return Err(CodecError::InvalidName(key.to_string()));
        }

        let entries = self.groups.entry(group.to_string()).or_default();
        if entries.get(key).map(String::as_str) == Some(escaped) {
            return Ok(false);
        }
        entries.insert(key.to_string(), escaped.to_string());
        Ok(true)
    }

    /// Escape and store `value`, or remove the key when `value` is `None`.
    pub fn set_typed(
        &mut self,
        group: &str,
        key: &str,
        value: Option<&Value>,
    ) -> Result<bool, CodecError> {
        match value {
            Some(value) => {
                let escaped = self.codec().escape(value);
                self.set_value(group, key, &escaped)
            }
            None => Ok(self.remove_key(group, key)),
        }
    }

    /// Decode the value at `group`/`key` as `ty`; `Ok(None)` when unset.
    pub fn get_typed(
        &self,
        group: &str,
        key: &str,
        ty: ValueType,
    ) -> Result<Option<Value>, CodecError> {
        self.get_value(group, key)
            .map(|escaped| self.codec().unescape(escaped, ty))
            .transpose()
    }

    /// Ensure `group` exists. Returns whether it was added.
    pub fn add_group(&mut self, group: &str) -> Result<bool, CodecError> {
        if !is_valid_group_name(group) {
            return Err(CodecError::InvalidName(group.to_string()));
        }
        if self.groups.contains_key(group) {
            return Ok(false);
        }
        self.groups.insert(group.to_string(), BTreeMap::new());
        Ok(true)
    }

    pub fn remove_key(&mut self, group: &str, key: &str) -> bool {
        self.groups
            .get_mut(group)
            .is_some_and(|entries| entries.remove(key).is_some())
    }

    pub fn remove_group(&mut self, group: &str) -> bool {
        self.groups.remove(group).is_some()
    }
}

fn syntax(line: usize, detail: &str) -> CodecError {
    CodecError::Syntax {
        line,
        detail: detail.to_string(),
    }
}

fn is_valid_group_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['[', ']']) && !name.chars().any(char::is_control)
}

fn is_valid_key_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('#')
        && !name.contains(['=', '[', ']'])
        && !name.chars().any(char::is_control)
        && name.trim() == name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SimplePresence;

    const SAMPLE: &str = "\
# accounts
[gabble/jabber/alice_40example_2ecom0]
manager=gabble
param-account=alice@example.com
DisplayName=\\sAlice

[idle/irc/bob0]
Enabled=true
";

    #[test]
    fn parses_groups_and_keys() {
        let file = KeyFile::parse(SAMPLE, ',').unwrap();
        assert_eq!(
            file.groups().collect::<Vec<_>>(),
            vec!["gabble/jabber/alice_40example_2ecom0", "idle/irc/bob0"]
        );
        assert_eq!(
            file.get_value("gabble/jabber/alice_40example_2ecom0", "param-account"),
            Some("alice@example.com")
        );
        assert_eq!(
            file.get_typed("gabble/jabber/alice_40example_2ecom0", "DisplayName", ValueType::String)
                .unwrap(),
            Some(Value::from(" Alice"))
        );
        assert_eq!(
            file.get_typed("idle/irc/bob0", "Enabled", ValueType::Boolean)
                .unwrap(),
            Some(Value::Boolean(true))
        );
        assert_eq!(file.keys("missing").count(), 0);
    }

    #[test]
    fn serialization_reparses_to_the_same_file() {
        let file = KeyFile::parse(SAMPLE, ',').unwrap();
        let again = KeyFile::parse(&file.to_data(), ',').unwrap();
        assert_eq!(file, again);
    }

    #[test]
    fn syntax_errors_report_the_line() {
        let err = KeyFile::parse("orphan=1\n", ',').unwrap_err();
        assert_eq!(
            err,
            CodecError::Syntax {
                line: 1,
                detail: "key outside of any group".into()
            }
        );
        assert!(matches!(
            KeyFile::parse("[ok]\nno equals sign\n", ','),
            Err(CodecError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            KeyFile::parse("[broken\n", ','),
            Err(CodecError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn set_typed_reports_changes() {
        let mut file = KeyFile::default();
        let presence = Value::from(SimplePresence::new(2, "available", ""));

        assert!(file.set_typed("a", "AutomaticPresence", Some(&presence)).unwrap());
        assert!(!file.set_typed("a", "AutomaticPresence", Some(&presence)).unwrap());
        assert_eq!(file.get_value("a", "AutomaticPresence"), Some("2,available,,"));
        assert!(file.set_typed("a", "AutomaticPresence", None).unwrap());
        assert!(!file.set_typed("a", "AutomaticPresence", None).unwrap());
        assert!(file.has_group("a"));
    }

    #[test]
    fn rejects_unwritable_names() {
        let mut file = KeyFile::default();
        assert!(file.set_value("g", "bad=key", "v").is_err());
        assert!(file.set_value("g", " padded", "v").is_err());
        // would be read back as a comment
        assert!(file.set_value("g", "#x", "v").is_err());
        assert!(file.set_value("g", "param-#x", "v").unwrap());
        assert!(file.set_value("g[1]", "key", "v").is_err());
        assert!(file.set_value("g", "key", "multi\nline").is_err());
        assert!(file.add_group("").is_err());
    }

    #[test]
    fn removal() {
        let mut file = KeyFile::parse(SAMPLE, ',').unwrap();
        assert!(file.remove_key("idle/irc/bob0", "Enabled"));
        assert!(!file.remove_key("idle/irc/bob0", "Enabled"));
        assert!(file.has_group("idle/irc/bob0"));
        assert!(file.remove_group("idle/irc/bob0"));
        assert!(!file.has_group("idle/irc/bob0"));
    }
}
