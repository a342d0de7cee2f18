//! Diagnostics utilities for reporting template and config errors with source spans.
use codespan_reporting::{
    diagnostic::{Diagnostic, Severity},
    files, term,
};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

pub use crate::lint::lint;

/// Identifier for a source file in the diagnostics registry.
pub type FileId = usize;
/// A byte-offset span in a source file.
pub type Span = std::ops::Range<usize>;

/// Diagnostics error kinds.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failed to lookup or access a registered source file.
    #[error("failed to lookup file")]
    FileLookup(#[from] codespan_reporting::files::Error),
}

/// Convert an item into a sequence of diagnostics associated with a file.
pub trait ToDiagnostics {
    /// Generate diagnostics for this item, tagged with `file_id`.
    fn to_diagnostics<F: Copy + PartialEq>(&self, file_id: F) -> Vec<Diagnostic<F>>;
}

/// Extension methods for `Diagnostic` to simplify severity checks.
pub trait DiagnosticExt {
    /// Returns `true` if the diagnostic severity is error or bug.
    fn is_error(&self) -> bool;
}

impl<F> DiagnosticExt for Diagnostic<F> {
    fn is_error(&self) -> bool {
        match self.severity {
            Severity::Bug | Severity::Error => true,
            Severity::Warning | Severity::Note | Severity::Help => false,
        }
    }
}

/// Associates a value with its source span for error reporting.
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    /// The inner value.
    pub inner: T,
    /// The byte-offset span where `inner` was found.
    pub span: Span,
}

impl<T> AsRef<T> for Spanned<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Spanned<T> {
    pub fn new(span: impl Into<Span>, value: T) -> Self {
        Self {
            span: span.into(),
            inner: value,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Display for Spanned<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl<T> PartialEq for Spanned<T>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner && self.span == other.span
    }
}

impl<T> Eq for Spanned<T> where T: Eq {}

impl<T> std::hash::Hash for Spanned<T>
where
    T: std::hash::Hash,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
        self.span.hash(state);
    }
}

/// A diagnostics printer that buffers messages for later emission.
pub type BufferedPrinter = Printer<term::termcolor::Buffer>;
/// A diagnostics printer that writes formatted messages to stderr.
pub type StderrPrinter = Printer<term::termcolor::StandardStream>;

/// Printer that tracks source files and emits formatted diagnostics.
pub struct Printer<W> {
    /// Underlying writer protected by a mutex for thread safety.
    writer: Mutex<W>,
    /// Configuration for diagnostic formatting (colors, styles).
    diagnostic_config: term::Config,
    /// In-memory registry of source files and their content.
    files: RwLock<files::SimpleFiles<String, String>>,
}

impl<W> std::fmt::Debug for Printer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer").finish_non_exhaustive()
    }
}

/// Convert an object into a diagnostics source name (e.g., file path or id).
pub trait ToSourceName {
    /// Transform to a string used as a source name in diagnostics.
    fn to_source_name(self) -> String;
}

impl ToSourceName for String {
    fn to_source_name(self) -> String {
        self
    }
}

impl ToSourceName for &str {
    fn to_source_name(self) -> String {
        self.to_string()
    }
}

impl ToSourceName for &Path {
    fn to_source_name(self) -> String {
        self.to_string_lossy().to_string()
    }
}

impl ToSourceName for &PathBuf {
    fn to_source_name(self) -> String {
        self.to_string_lossy().to_string()
    }
}

fn default_diagnostic_config() -> term::Config {
    term::Config {
        styles: term::Styles::with_blue(term::termcolor::Color::Blue),
        ..term::Config::default()
    }
}

impl Default for Printer<term::termcolor::StandardStream> {
    fn default() -> Self {
        Self::stderr(None)
    }
}

impl Default for Printer<term::termcolor::Buffer> {
    fn default() -> Self {
        Self::buffered()
    }
}

impl Printer<term::termcolor::Buffer> {
    #[must_use]
    pub fn buffered() -> Self {
        Self {
            writer: Mutex::new(term::termcolor::Buffer::no_color()),
            diagnostic_config: default_diagnostic_config(),
            files: RwLock::new(files::SimpleFiles::new()),
        }
    }

    /// The diagnostics written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        let writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        String::from_utf8_lossy(writer.as_slice()).to_string()
    }
}

impl Printer<term::termcolor::StandardStream> {
    #[must_use]
    pub fn stderr(color_choice: Option<term::termcolor::ColorChoice>) -> Self {
        let color_choice = color_choice.unwrap_or(term::termcolor::ColorChoice::Auto);
        Self {
            writer: Mutex::new(term::termcolor::StandardStream::stderr(color_choice)),
            diagnostic_config: default_diagnostic_config(),
            files: RwLock::new(files::SimpleFiles::new()),
        }
    }
}

impl<W> Printer<W> {
    /// Zero-based line indices of the labels of `diagnostic`.
    ///
    /// # Errors
    /// When a label refers to an unknown file or an out of bounds offset.
    pub fn lines(&self, diagnostic: &Diagnostic<FileId>) -> Result<Vec<usize>, Error> {
        use codespan_reporting::files::Files;
        let files = self
            .files
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        diagnostic
            .labels
            .iter()
            .map(|label| Ok(files.line_index(label.file_id, label.range.start)?))
            .collect()
    }

    pub fn add_source_file(&self, name: impl ToSourceName, source: String) -> FileId {
        let mut files = self
            .files
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        files.add(name.to_source_name(), source)
    }
}

impl<W> Printer<W>
where
    W: term::termcolor::WriteColor,
{
    /// Render `diagnostic` to the underlying writer.
    ///
    /// # Errors
    /// When the diagnostic refers to an unknown file or cannot be written.
    pub fn emit(&self, diagnostic: &Diagnostic<FileId>) -> Result<(), Error> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let files = self
            .files
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        term::emit(&mut *writer, &self.diagnostic_config, &*files, diagnostic)?;
        Ok(())
    }
}
