//! Parse phase: rewrite extended specifiers and resolve the argument positions that
//! need escaping or hex encoding.
use crate::diagnostics::Spanned;
use crate::escape::Transform;
use crate::spec::{self, Kind, Specifier, Token};
use indexmap::IndexSet;
use std::borrow::Cow;

/// Leading whitespace of every line. `\s` includes newlines, so blank lines collapse.
static LEADING_WHITESPACE_REGEX: once_cell::sync::Lazy<regex::Regex> =
    once_cell::sync::Lazy::new(|| {
        regex::RegexBuilder::new(r"^\s+")
            .multi_line(true)
            .build()
            .unwrap()
    });

/// Remove leading whitespace from every line of `template`.
///
/// # Examples
/// ```
/// use sprintf_sql::template::strip_leading_whitespace;
/// assert_eq!(strip_leading_whitespace("  SELECT *\n\t FROM t"), "SELECT *\nFROM t");
/// ```
#[must_use]
pub fn strip_leading_whitespace(template: &str) -> Cow<'_, str> {
    LEADING_WHITESPACE_REGEX.replace_all(template, "")
}

/// Immutable result of compiling a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// The rewritten template, understood by [`crate::printf::vsprintf`].
    pub template: String,
    /// Sequential specifiers in template order, spans refer to the original template.
    pub specifiers: Vec<Spanned<Specifier>>,
    /// Specifiers with an explicit `argnum$` reference.
    pub references: Vec<Spanned<Specifier>>,
    /// 0-based argument indices that must be escaped.
    pub escape: IndexSet<usize>,
    /// 0-based argument indices that must be hex encoded.
    pub hex: IndexSet<usize>,
}

impl CompiledTemplate {
    /// Compile `source`, optionally stripping leading whitespace from every line.
    #[must_use]
    pub fn compile(source: &str, strip_leading_whitespace: bool) -> Self {
        let tokens = spec::tokenize(source);

        let rewritten = rewrite(&tokens);
        let template = if strip_leading_whitespace {
            self::strip_leading_whitespace(&rewritten).into_owned()
        } else {
            rewritten
        };

        let (specifiers, references): (Vec<_>, Vec<_>) = tokens
            .into_iter()
            .filter_map(|token| match token.inner {
                Token::Specifier(spec) if spec.takes_argument() => {
                    Some(Spanned::new(token.span, spec))
                }
                _ => None,
            })
            .partition(|spec| !spec.is_reference());

        let Positions { escape, hex } = resolve(&specifiers, &references);

        tracing::debug!(
            specifiers = specifiers.len(),
            references = references.len(),
            ?escape,
            ?hex,
            "compiled template"
        );

        Self {
            template,
            specifiers,
            references,
            escape,
            hex,
        }
    }

    /// The transform required for argument `index`.
    ///
    /// Hex encoding takes precedence: its output never contains characters that need
    /// escaping.
    #[must_use]
    pub fn transform(&self, index: usize) -> Option<Transform> {
        if self.hex.contains(&index) {
            Some(Transform::Hex)
        } else if self.escape.contains(&index) {
            Some(Transform::Escape)
        } else {
            None
        }
    }

    /// Minimum number of arguments the template needs.
    #[must_use]
    pub fn required_arguments(&self) -> usize {
        let referenced = self
            .references
            .iter()
            .filter_map(|spec| spec.argnum)
            .max()
            .unwrap_or(0);
        self.specifiers.len().max(referenced)
    }
}

/// Rewrite extended specifiers into decorated `%s` specifiers.
///
/// Everything else, including unknown conversions, is copied verbatim.
#[must_use]
pub fn rewrite(tokens: &[Spanned<Token<'_>>]) -> String {
    tokens
        .iter()
        .fold(String::new(), |mut template, token| {
            match &token.inner {
                Token::Literal(text) | Token::Dangling(text) => template.push_str(text),
                Token::Percent => template.push_str("%%"),
                Token::Specifier(spec) => match spec.kind() {
                    Kind::Extended(extension) => template.push_str(&spec.rewrite(extension)),
                    Kind::Native | Kind::Percent | Kind::Unknown => template.push_str(&spec.raw),
                },
            }
            template
        })
}

#[derive(Debug, Default)]
struct Positions {
    escape: IndexSet<usize>,
    hex: IndexSet<usize>,
}

impl Positions {
    fn insert(&mut self, index: usize, spec: &Specifier) {
        let Kind::Extended(extension) = spec.kind() else {
            return;
        };
        match extension.transform() {
            Transform::Escape => self.escape.insert(index),
            Transform::Hex => self.hex.insert(index),
        };
    }
}

/// Map extended specifiers to the argument index they consume.
///
/// Sequential specifiers own consecutive indices. A reference `%N$` merges its
/// requirement into index `N - 1` without advancing the sequence.
fn resolve(specifiers: &[Spanned<Specifier>], references: &[Spanned<Specifier>]) -> Positions {
    let mut positions = Positions::default();
    for (index, spec) in specifiers.iter().enumerate() {
        positions.insert(index, spec);
    }
    for spec in references {
        // `%0$` is rejected when formatting
        if let Some(index) = spec.argnum.and_then(|argnum| argnum.checked_sub(1)) {
            positions.insert(index, spec);
        }
    }
    positions
}
