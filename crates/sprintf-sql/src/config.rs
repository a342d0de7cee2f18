//! `sprintf.toml` configuration files.
//!
//! ```toml
//! strip_leading_whitespace = true
//!
//! [templates]
//! insert_user = "INSERT INTO %T (name) VALUES (%A)"
//! raw = { template = "SELECT\n  %S", strip_leading_whitespace = false }
//! ```
use crate::diagnostics::{Printer, Span, ToDiagnostics};
use crate::sprintf::{Options, Sprintf};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::term::termcolor::WriteColor;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use toml_span as toml;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read config file {path:?}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config file {path:?}")]
    Toml {
        #[source]
        source: ParseError,
        path: PathBuf,
    },
    #[error(transparent)]
    Diagnostics(#[from] crate::diagnostics::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("{message}")]
    MissingKey {
        key: String,
        message: String,
        span: Span,
    },
    #[error("{message}")]
    UnexpectedType {
        message: String,
        expected: Vec<ValueKind>,
        found: ValueKind,
        span: Span,
    },
    #[error("{source}")]
    Toml {
        #[source]
        source: toml_span::Error,
    },
}

mod diagnostics {
    use crate::diagnostics::ToDiagnostics;
    use codespan_reporting::diagnostic::{Diagnostic, Label};

    impl ToDiagnostics for super::ParseError {
        fn to_diagnostics<F: Copy + PartialEq>(&self, file_id: F) -> Vec<Diagnostic<F>> {
            match self {
                Self::MissingKey {
                    message, key, span, ..
                } => vec![Diagnostic::error()
                    .with_message(format!("missing required key `{key}`"))
                    .with_labels(vec![
                        Label::secondary(file_id, span.clone()).with_message(message)
                    ])],
                Self::UnexpectedType {
                    expected,
                    found,
                    span,
                    ..
                } => {
                    let expected = expected
                        .iter()
                        .map(|ty| format!("`{ty:?}`"))
                        .collect::<Vec<_>>()
                        .join(", or ");
                    let diagnostic = Diagnostic::error()
                        .with_message(self.to_string())
                        .with_labels(vec![Label::primary(file_id, span.clone())
                            .with_message(format!("expected {expected}"))])
                        .with_notes(vec![unindent::unindent(&format!(
                            "
                        expected type {expected}
                           found type `{found:?}`
                        "
                        ))]);
                    vec![diagnostic]
                }
                Self::Toml { source } => vec![Diagnostic::error()
                    .with_message("invalid toml")
                    .with_labels(vec![
                        Label::primary(file_id, source.span).with_message(source.to_string())
                    ])],
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Table,
}

impl<'de> From<&toml_span::Value<'de>> for ValueKind {
    fn from(value: &toml_span::Value<'de>) -> Self {
        value.as_ref().into()
    }
}

impl<'de> From<&toml_span::value::ValueInner<'de>> for ValueKind {
    fn from(value: &toml_span::value::ValueInner<'de>) -> Self {
        use toml_span::value::ValueInner;
        match value {
            ValueInner::String(..) => ValueKind::String,
            ValueInner::Integer(..) => ValueKind::Integer,
            ValueInner::Float(..) => ValueKind::Float,
            ValueInner::Boolean(..) => ValueKind::Boolean,
            ValueInner::Array(..) => ValueKind::Array,
            ValueInner::Table(..) => ValueKind::Table,
        }
    }
}

#[inline]
fn as_str<'de>(value: &'de toml::Value<'de>) -> Result<&'de str, ParseError> {
    value.as_str().ok_or_else(|| ParseError::UnexpectedType {
        message: "expected a string".to_string(),
        expected: vec![ValueKind::String],
        found: value.into(),
        span: value.span.into(),
    })
}

#[inline]
fn as_bool<'de>(value: &'de toml::Value<'de>) -> Result<bool, ParseError> {
    value.as_bool().ok_or_else(|| ParseError::UnexpectedType {
        message: "expected a boolean".to_string(),
        expected: vec![ValueKind::Boolean],
        found: value.into(),
        span: value.span.into(),
    })
}

/// A named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    pub template: String,
    /// Overrides the file wide setting.
    pub strip_leading_whitespace: Option<bool>,
    /// Location of the template definition in the config file.
    pub span: Span,
}

impl TemplateConfig {
    #[must_use]
    pub fn options(&self, defaults: Options) -> Options {
        Options {
            strip_leading_whitespace: self
                .strip_leading_whitespace
                .unwrap_or(defaults.strip_leading_whitespace),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub strip_leading_whitespace: Option<bool>,
    pub templates: IndexMap<String, TemplateConfig>,
}

const KNOWN_KEYS: [&str; 2] = ["strip_leading_whitespace", "templates"];
const KNOWN_TEMPLATE_KEYS: [&str; 2] = ["template", "strip_leading_whitespace"];

fn warn_unknown_keys<F: Copy + PartialEq>(
    table: &toml::value::Table<'_>,
    known: &[&str],
    file_id: F,
    diagnostics: &mut Vec<Diagnostic<F>>,
) {
    for key in table.keys() {
        if known.contains(&&*key.name) {
            continue;
        }
        tracing::warn!(key = %key.name, "unknown config key");
        diagnostics.push(
            Diagnostic::warning()
                .with_message(format!("unknown key `{}`", key.name))
                .with_labels(vec![Label::primary(file_id, key.span).with_message("ignored")])
                .with_notes(vec![format!(
                    "expected one of {}",
                    known
                        .iter()
                        .map(|key| format!("`{key}`"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )]),
        );
    }
}

fn parse_template<'de, F: Copy + PartialEq>(
    value: &'de toml::Value<'de>,
    file_id: F,
    diagnostics: &mut Vec<Diagnostic<F>>,
) -> Result<TemplateConfig, ParseError> {
    match value.as_ref() {
        toml::value::ValueInner::String(template) => Ok(TemplateConfig {
            template: template.to_string(),
            strip_leading_whitespace: None,
            span: value.span.into(),
        }),
        toml::value::ValueInner::Table(table) => {
            warn_unknown_keys(table, &KNOWN_TEMPLATE_KEYS, file_id, diagnostics);
            let template = table
                .get("template")
                .map(as_str)
                .transpose()?
                .ok_or_else(|| ParseError::MissingKey {
                    key: "template".to_string(),
                    message: "template config must specify `template`".to_string(),
                    span: value.span.into(),
                })?;
            let strip_leading_whitespace = table
                .get("strip_leading_whitespace")
                .map(as_bool)
                .transpose()?;
            Ok(TemplateConfig {
                template: template.to_string(),
                strip_leading_whitespace,
                span: value.span.into(),
            })
        }
        _ => Err(ParseError::UnexpectedType {
            message: "template must be a string or a table".to_string(),
            expected: vec![ValueKind::String, ValueKind::Table],
            found: value.into(),
            span: value.span.into(),
        }),
    }
}

impl Config {
    /// Parse a parsed `sprintf.toml` document.
    ///
    /// Unknown keys are reported as warnings in `diagnostics`.
    ///
    /// # Errors
    /// When a value has the wrong type or a template table has no `template`.
    pub fn from_toml_value<F: Copy + PartialEq>(
        config: &toml::Value<'_>,
        file_id: F,
        diagnostics: &mut Vec<Diagnostic<F>>,
    ) -> Result<Self, ParseError> {
        let table = config.as_table().ok_or_else(|| ParseError::UnexpectedType {
            message: "config must be a table".to_string(),
            expected: vec![ValueKind::Table],
            found: config.into(),
            span: config.span.into(),
        })?;
        warn_unknown_keys(table, &KNOWN_KEYS, file_id, diagnostics);

        let strip_leading_whitespace = table
            .get("strip_leading_whitespace")
            .map(as_bool)
            .transpose()?;

        let templates = match table.get("templates") {
            None => IndexMap::new(),
            Some(value) => match value.as_ref() {
                toml::value::ValueInner::Table(templates) => templates
                    .iter()
                    .map(|(name, value)| {
                        let template = parse_template(value, file_id, diagnostics)?;
                        Ok((name.name.to_string(), template))
                    })
                    .collect::<Result<IndexMap<_, _>, _>>()?,
                _ => {
                    return Err(ParseError::UnexpectedType {
                        message: "templates must be a table".to_string(),
                        expected: vec![ValueKind::Table],
                        found: value.into(),
                        span: value.span.into(),
                    });
                }
            },
        };

        tracing::debug!(templates = templates.len(), "parsed config");
        Ok(Self {
            strip_leading_whitespace,
            templates,
        })
    }

    /// Parse the contents of a `sprintf.toml` file.
    ///
    /// # Errors
    /// When `config` is not valid TOML or does not describe a valid config.
    pub fn from_toml<F: Copy + PartialEq>(
        config: &str,
        file_id: F,
        diagnostics: &mut Vec<Diagnostic<F>>,
    ) -> Result<Self, ParseError> {
        let config = toml_span::parse(config).map_err(|source| ParseError::Toml { source })?;
        Self::from_toml_value(&config, file_id, diagnostics)
    }

    /// File wide options, falling back to the defaults.
    #[must_use]
    pub fn options(&self) -> Options {
        let defaults = Options::default();
        Options {
            strip_leading_whitespace: self
                .strip_leading_whitespace
                .unwrap_or(defaults.strip_leading_whitespace),
        }
    }

    /// Compile the template called `name`.
    #[must_use]
    pub fn sprintf(&self, name: &str) -> Option<Sprintf> {
        let template = self.templates.get(name)?;
        Some(Sprintf::with_options(
            template.template.as_str(),
            template.options(self.options()),
        ))
    }
}

/// Config files in `dir`, in the order they are looked up.
pub fn config_file_locations(dir: &Path) -> impl Iterator<Item = PathBuf> + use<'_> {
    ["sprintf.toml", ".sprintf.toml"]
        .into_iter()
        .map(|name| dir.join(name))
}

/// Read and parse the config file at `path`.
///
/// Diagnostics are emitted to `printer`.
///
/// # Errors
/// When the file cannot be read or parsed, or the diagnostics cannot be emitted.
pub fn load_config<W>(path: &Path, printer: &Printer<W>) -> Result<Config, Error>
where
    W: WriteColor,
{
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        source,
        path: path.to_path_buf(),
    })?;
    let file_id = printer.add_source_file(path, source.clone());

    let mut diagnostics = vec![];
    let config = Config::from_toml(&source, file_id, &mut diagnostics);
    if let Err(ref err) = config {
        diagnostics.extend(err.to_diagnostics(file_id));
    }
    for diagnostic in &diagnostics {
        printer.emit(diagnostic)?;
    }
    config.map_err(|source| Error::Toml {
        source,
        path: path.to_path_buf(),
    })
}

/// Find a config file in one of the default config file locations.
///
/// # Errors
/// When the config file cannot be read or parsed.
pub fn find_config<W>(dir: &Path, printer: &Printer<W>) -> Result<Option<(PathBuf, Config)>, Error>
where
    W: WriteColor,
{
    let Some(path) = config_file_locations(dir).find(|path| path.is_file()) else {
        return Ok(None);
    };
    tracing::debug!(path = %path.display(), "found config file");
    let config = load_config(&path, printer)?;
    Ok(Some((path, config)))
}
