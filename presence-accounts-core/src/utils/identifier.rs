//! Identifier escaping for account names and object paths.

use std::fmt::Write as _;

/// Escape an arbitrary string into `[A-Za-z0-9_]`.
///
/// Letters and digits pass through, except a leading digit. Every other byte
/// becomes `_xx` with two lowercase hex digits. The empty string becomes `_`.
/// The mapping is injective, so distinct inputs never collide.
#[must_use]
pub fn escape_as_identifier(input: &str) -> String {
    if input.is_empty() {
        return "_".to_string();
    }

    let mut out = String::with_capacity(input.len());
    for (i, byte) in input.bytes().enumerate() {
        if byte.is_ascii_alphabetic() || (byte.is_ascii_digit() && i > 0) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "_{byte:02x}");
        }
    }
    out
}
