//! Dynamically typed template arguments.
//!
//! A `Value` is what a template binds to. Strings and raw bytes are the common case,
//! numbers and booleans coerce the same way scripting-language `sprintf` implementations
//! coerce them (`true` is `"1"`, `null` and `false` are empty, numeric strings are read
//! up to the first non-numeric character).
use std::borrow::Cow;

/// A single positional argument.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Leading numeric prefix of a string, e.g. `"  -12.5e3kg"` -> `"-12.5e3"`.
static NUMERIC_PREFIX_REGEX: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| {
        regex::RegexBuilder::new(r"^[ \t\n\r\v\f]*(?P<number>[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
            .build()
            .unwrap()
    });

/// Significant digits used when converting floats to text.
const FLOAT_TO_STRING_PRECISION: usize = 14;

impl Value {
    /// Returns `true` if this value renders as the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_bytes().is_empty()
    }

    /// The text form of this value.
    ///
    /// Byte values that are not valid UTF-8 are converted lossily.
    ///
    /// # Examples
    /// ```
    /// use sprintf_sql::Value;
    /// assert_eq!(Value::from(true).to_text(), "1");
    /// assert_eq!(Value::from(false).to_text(), "");
    /// assert_eq!(Value::from(1.5).to_text(), "1.5");
    /// ```
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null | Self::Bool(false) => Cow::Borrowed(""),
            Self::Bool(true) => Cow::Borrowed("1"),
            Self::Int(value) => Cow::Owned(value.to_string()),
            Self::Float(value) => Cow::Owned(float_to_string(*value)),
            Self::Str(value) => Cow::Borrowed(value.as_str()),
            Self::Bytes(value) => String::from_utf8_lossy(value),
        }
    }

    /// The raw bytes of this value.
    ///
    /// Unlike [`Value::to_text`], this never replaces invalid UTF-8.
    #[must_use]
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Str(value) => Cow::Borrowed(value.as_bytes()),
            Self::Bytes(value) => Cow::Borrowed(value.as_slice()),
            other => match other.to_text() {
                Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
                Cow::Owned(text) => Cow::Owned(text.into_bytes()),
            },
        }
    }

    /// Integer interpretation of this value.
    ///
    /// Floats are truncated towards zero, strings are read up to the first character
    /// that cannot be part of a number and are `0` if there is no numeric prefix.
    #[must_use]
    pub fn to_int(&self) -> i64 {
        match self {
            Self::Null | Self::Bool(false) => 0,
            Self::Bool(true) => 1,
            Self::Int(value) => *value,
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(value) => *value as i64,
            Self::Str(_) | Self::Bytes(_) => match numeric_prefix(&self.to_text()) {
                Some(number) if is_integer_literal(number) => number
                    .parse::<i64>()
                    .unwrap_or_else(|_| saturate(number.parse::<f64>().unwrap_or_default())),
                #[allow(clippy::cast_possible_truncation)]
                Some(number) => number.parse::<f64>().unwrap_or_default() as i64,
                None => 0,
            },
        }
    }

    /// Floating point interpretation of this value.
    #[must_use]
    pub fn to_float(&self) -> f64 {
        match self {
            Self::Null | Self::Bool(false) => 0.0,
            Self::Bool(true) => 1.0,
            #[allow(clippy::cast_precision_loss)]
            Self::Int(value) => *value as f64,
            Self::Float(value) => *value,
            Self::Str(_) | Self::Bytes(_) => numeric_prefix(&self.to_text())
                .and_then(|number| number.parse::<f64>().ok())
                .unwrap_or_default(),
        }
    }
}

fn numeric_prefix(value: &str) -> Option<&str> {
    NUMERIC_PREFIX_REGEX
        .captures(value)
        .and_then(|captures| captures.name("number"))
        .map(|number| number.as_str())
}

fn is_integer_literal(number: &str) -> bool {
    !number.contains(['.', 'e', 'E'])
}

#[allow(clippy::cast_possible_truncation)]
fn saturate(value: f64) -> i64 {
    // `as` saturates at the integer bounds
    value as i64
}

pub(crate) fn float_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-INF" } else { "INF" }.to_string();
    }
    let digits = crate::printf::general(value.abs(), FLOAT_TO_STRING_PRECISION, 'E');
    if value.is_sign_negative() && value != 0.0 {
        format!("-{digits}")
    } else {
        digits
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Str(value.to_string()), Self::Int)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Str(value.to_string()), Self::Int)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        // isize is at most 64 bits wide on supported targets
        Self::Int(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Cow<'_, str>> for Value {
    fn from(value: Cow<'_, str>) -> Self {
        Self::Str(value.into_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(value: &[u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use similar_asserts::assert_eq as sim_assert_eq;

    #[test]
    fn converts_scalars_to_text() {
        crate::tests::init();
        sim_assert_eq!(Value::Null.to_text(), "");
        sim_assert_eq!(Value::from(true).to_text(), "1");
        sim_assert_eq!(Value::from(false).to_text(), "");
        sim_assert_eq!(Value::from(-42).to_text(), "-42");
        sim_assert_eq!(Value::from(0.1 + 0.2).to_text(), "0.3");
        sim_assert_eq!(Value::from(1.0).to_text(), "1");
        sim_assert_eq!(Value::from(-2.5).to_text(), "-2.5");
        sim_assert_eq!(Value::from(1e20).to_text(), "1.0E+20");
        sim_assert_eq!(Value::from(0.00001).to_text(), "1.0E-5");
        sim_assert_eq!(Value::from(f64::INFINITY).to_text(), "INF");
        sim_assert_eq!(Value::from(None::<&str>).to_text(), "");
    }

    #[test]
    fn keeps_raw_bytes() {
        crate::tests::init();
        let value = Value::from(vec![0xff, 0x00, b'a']);
        sim_assert_eq!(value.to_bytes().as_ref(), &[0xff, 0x00, b'a']);
        sim_assert_eq!(value.to_text(), "\u{fffd}\u{0}a");
        assert!(!value.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::Null.is_empty());
    }

    #[test]
    fn reads_numeric_prefixes() {
        crate::tests::init();
        sim_assert_eq!(Value::from("42").to_int(), 42);
        sim_assert_eq!(Value::from("  -17 apples").to_int(), -17);
        sim_assert_eq!(Value::from("3.99").to_int(), 3);
        sim_assert_eq!(Value::from("1e3").to_int(), 1000);
        sim_assert_eq!(Value::from("apples").to_int(), 0);
        sim_assert_eq!(Value::from("99999999999999999999").to_int(), i64::MAX);
        sim_assert_eq!(Value::from("2.5kg").to_float(), 2.5);
        sim_assert_eq!(Value::from(".5").to_float(), 0.5);
        sim_assert_eq!(Value::from(7).to_float(), 7.0);
        sim_assert_eq!(Value::from(-7.9).to_int(), -7);
    }

    #[test]
    fn converts_large_unsigned_integers_to_strings() {
        crate::tests::init();
        sim_assert_eq!(Value::from(u64::MAX), Value::Str(u64::MAX.to_string()));
        sim_assert_eq!(Value::from(7_u64), Value::Int(7));
    }
}
