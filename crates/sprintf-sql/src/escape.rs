//! Transforms applied to arguments before interpolation.
//!
//! - [`escape`] backslash-escapes quotes, backslashes, DEL and ASCII control characters,
//!   so the value can be embedded in a quoted string or identifier literal.
//! - [`hex_literal`] renders raw bytes as a `0x`-prefixed hexadecimal literal.
use crate::value::Value;
use std::borrow::Cow;
use std::fmt::Write;

/// Matches every character that must be preceded by a backslash.
///
/// All of them are ASCII, so matching never splits a multi-byte UTF-8 sequence.
static ESCAPE_REGEX: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::RegexBuilder::new(r#"[\x00-\x1F"'\\\x7F]"#)
        .build()
        .unwrap()
});

static ESCAPE_BYTES_REGEX: once_cell::sync::Lazy<regex::bytes::Regex> =
    once_cell::sync::Lazy::new(|| {
        regex::bytes::RegexBuilder::new(r#"[\x00-\x1F"'\\\x7F]"#)
            .unicode(false)
            .build()
            .unwrap()
    });

/// Literal emitted by [`hex_literal`] for empty input.
pub const EMPTY_HEX_LITERAL: &str = r#""""#;

/// Backslash-escape `"`, `'`, `\`, DEL and all control characters `0x00..=0x1F`.
///
/// # Examples
/// ```
/// use sprintf_sql::escape::escape;
/// assert_eq!(escape("O'Brien"), r"O\'Brien");
/// assert_eq!(escape("plain"), "plain");
/// ```
#[must_use]
pub fn escape(value: &str) -> Cow<'_, str> {
    ESCAPE_REGEX.replace_all(value, r"\$0")
}

/// Byte-oriented variant of [`escape`] for values that are not valid UTF-8.
#[must_use]
pub fn escape_bytes(value: &[u8]) -> Cow<'_, [u8]> {
    ESCAPE_BYTES_REGEX.replace_all(value, &b"\\$0"[..])
}

/// Render `bytes` as a lowercase hex literal.
///
/// Empty input yields `""`, because `0x` alone is not a valid literal.
///
/// # Examples
/// ```
/// use sprintf_sql::escape::hex_literal;
/// assert_eq!(hex_literal(b"\x00\x01"), "0x0001");
/// assert_eq!(hex_literal(b""), r#""""#);
/// ```
#[must_use]
pub fn hex_literal(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return EMPTY_HEX_LITERAL.to_string();
    }
    let mut hex = String::with_capacity(2 + 2 * bytes.len());
    hex.push_str("0x");
    for byte in bytes {
        // writing to a string cannot fail
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// The transform a template position requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transform {
    Escape,
    Hex,
}

impl Transform {
    /// Apply this transform to `value`.
    ///
    /// Byte values stay bytes when escaped, everything else becomes a string.
    #[must_use]
    pub fn apply(self, value: &Value) -> Value {
        match (self, value) {
            (Self::Hex, value) => Value::Str(hex_literal(&value.to_bytes())),
            (Self::Escape, Value::Bytes(bytes)) => Value::Bytes(escape_bytes(bytes).into_owned()),
            (Self::Escape, value) => Value::Str(escape(&value.to_text()).into_owned()),
        }
    }
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Escape => write!(f, "escape"),
            Self::Hex => write!(f, "hex"),
        }
    }
}
