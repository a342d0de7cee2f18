//! The bind phase.
use crate::diagnostics::Spanned;
use crate::printf;
use crate::spec::Specifier;
use crate::template::CompiledTemplate;
use crate::value::Value;
use indexmap::IndexSet;

/// Options for compiling a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Options {
    /// Remove leading whitespace from every line of the template.
    pub strip_leading_whitespace: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strip_leading_whitespace: true,
        }
    }
}

/// A compiled template that escapes and hex encodes its arguments before formatting.
///
/// In addition to the conversions of [`printf::vsprintf`], templates support
///
/// | Conversion | Output |
/// |---|---|
/// | `%A` `%a` | escaped, wrapped in single quotes |
/// | `%Q` `%q` | escaped, wrapped in double quotes |
/// | `%T` `%t` | escaped, wrapped in backticks |
/// | `%S` | escaped |
/// | `%H` | hex literal, `""` if empty |
///
/// Width, precision, padding and positional references work as for `%s`.
///
/// # Examples
/// ```
/// use sprintf_sql::Sprintf;
/// let insert = Sprintf::new("INSERT INTO %T (name) VALUES (%A)");
/// assert_eq!(
///     insert.bind(["people", "O'Brien"]).as_deref(),
///     Ok(r"INSERT INTO `people` (name) VALUES ('O\'Brien')"),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprintf {
    source: String,
    options: Options,
    compiled: CompiledTemplate,
}

impl Sprintf {
    /// Compile `template`, stripping leading whitespace from every line.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self::with_options(template, Options::default())
    }

    #[must_use]
    pub fn with_options(template: impl Into<String>, options: Options) -> Self {
        let source = template.into();
        let compiled = CompiledTemplate::compile(&source, options.strip_leading_whitespace);
        Self {
            source,
            options,
            compiled,
        }
    }

    /// Replace the template and recompute all derived state.
    pub fn init(&mut self, template: impl Into<String>, options: Options) -> &mut Self {
        *self = Self::with_options(template, options);
        self
    }

    /// Format `values` with this template.
    ///
    /// # Errors
    /// When the rewritten template cannot be formatted with `values`,
    /// e.g. because there are too few of them.
    pub fn bind<I, V>(&self, values: I) -> Result<String, printf::Error>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.bind_values(values.into_iter().map(Into::into).collect())
    }

    /// Format already converted `values` with this template.
    ///
    /// Used by the [`bind!`](crate::bind) and [`sprintf!`](crate::sprintf) macros.
    ///
    /// # Errors
    /// See [`Sprintf::bind`].
    pub fn bind_values(&self, mut values: Vec<Value>) -> Result<String, printf::Error> {
        // indices without an argument are reported by the formatter
        for (index, value) in values.iter_mut().enumerate() {
            if let Some(transform) = self.compiled.transform(index) {
                tracing::trace!(index, %transform, "transforming argument");
                *value = transform.apply(value);
            }
        }
        printf::vsprintf(&self.compiled.template, &values)
    }

    /// The template as passed in.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn options(&self) -> Options {
        self.options
    }

    /// The rewritten template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.compiled.template
    }

    /// Sequential specifiers in template order.
    #[must_use]
    pub fn specifiers(&self) -> &[Spanned<Specifier>] {
        &self.compiled.specifiers
    }

    /// Specifiers with an explicit argument number.
    #[must_use]
    pub fn references(&self) -> &[Spanned<Specifier>] {
        &self.compiled.references
    }

    /// 0-based indices of the arguments that are escaped.
    #[must_use]
    pub fn escape_indices(&self) -> &IndexSet<usize> {
        &self.compiled.escape
    }

    /// 0-based indices of the arguments that are hex encoded.
    #[must_use]
    pub fn hex_indices(&self) -> &IndexSet<usize> {
        &self.compiled.hex
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledTemplate {
        &self.compiled
    }
}

impl From<&str> for Sprintf {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for Sprintf {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}

/// Bind a variable number of arguments to a [`Sprintf`](crate::Sprintf).
///
/// # Examples
/// ```
/// use sprintf_sql::{bind, Sprintf};
/// let query = Sprintf::new("SELECT * FROM %T WHERE id=%d");
/// assert_eq!(bind!(query, "users", 42).as_deref(), Ok("SELECT * FROM `users` WHERE id=42"));
/// ```
#[macro_export]
macro_rules! bind {
    ($sprintf:expr $(, $value:expr)* $(,)?) => {
        $sprintf.bind_values(::std::vec![$($crate::Value::from($value)),*])
    };
}

/// Compile a template and bind a variable number of arguments to it.
///
/// # Examples
/// ```
/// use sprintf_sql::sprintf;
/// assert_eq!(sprintf!("%H", "\x00\x01").as_deref(), Ok("0x0001"));
/// ```
#[macro_export]
macro_rules! sprintf {
    ($template:expr $(, $value:expr)* $(,)?) => {
        $crate::Sprintf::new($template).bind_values(::std::vec![$($crate::Value::from($value)),*])
    };
}
