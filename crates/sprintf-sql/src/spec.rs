//! Scanner for printf-style conversion specifiers.
//!
//! The grammar is `%[argnum$][flags][width][.precision]conversion`, where flags are any
//! of `-` (left-justify), `+` (always print a sign), ` ` or `0` (pad character), or
//! `'c` (custom pad character `c`). `%%` is a literal percent sign.
//!
//! The same grammar is used to classify templates and to format them, so specifier
//! boundaries are identical in both phases.
use crate::diagnostics::Spanned;
use crate::escape::Transform;
pub use parser::tokenize;

/// Conversions understood by the formatting primitive.
pub const NATIVE_CONVERSIONS: [char; 14] = [
    'b', 'c', 'd', 'e', 'E', 'f', 'F', 'g', 'G', 'o', 's', 'u', 'x', 'X',
];

/// Conversions that are rewritten into decorated `%s` specifiers.
pub const EXTENDED_CONVERSIONS: [char; 8] = ['a', 'A', 'H', 'q', 'Q', 'S', 't', 'T'];

/// An extended conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extension {
    /// `%a` / `%A`: escaped, wrapped in single quotes.
    SingleQuoted,
    /// `%H`: hex literal.
    Hex,
    /// `%q` / `%Q`: escaped, wrapped in double quotes.
    DoubleQuoted,
    /// `%S`: escaped.
    Escaped,
    /// `%t` / `%T`: escaped, wrapped in backticks.
    Backticked,
}

impl Extension {
    #[must_use]
    pub fn from_conversion(conversion: char) -> Option<Self> {
        match conversion {
            'a' | 'A' => Some(Self::SingleQuoted),
            'H' => Some(Self::Hex),
            'q' | 'Q' => Some(Self::DoubleQuoted),
            'S' => Some(Self::Escaped),
            't' | 'T' => Some(Self::Backticked),
            _ => None,
        }
    }

    /// The quote character placed around the rewritten specifier, if any.
    #[must_use]
    pub fn decoration(self) -> Option<char> {
        match self {
            Self::SingleQuoted => Some('\''),
            Self::DoubleQuoted => Some('"'),
            Self::Backticked => Some('`'),
            Self::Hex | Self::Escaped => None,
        }
    }

    /// The transform the bound argument needs.
    #[must_use]
    pub fn transform(self) -> Transform {
        match self {
            Self::Hex => Transform::Hex,
            Self::SingleQuoted | Self::DoubleQuoted | Self::Escaped | Self::Backticked => {
                Transform::Escape
            }
        }
    }
}

/// Classification of a specifier by its conversion character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A conversion the formatting primitive handles directly.
    Native,
    /// A conversion that is rewritten before formatting.
    Extended(Extension),
    /// `%` with modifiers, e.g. `%5%`. Prints a percent sign and consumes no argument.
    Percent,
    /// Anything else. Left untouched and rejected when formatting.
    Unknown,
}

/// Modifiers between `%` (or `argnum$`) and the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    pub left_align: bool,
    pub always_sign: bool,
    pub pad: char,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            left_align: false,
            always_sign: false,
            pad: ' ',
        }
    }
}

/// A single conversion specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    /// The specifier as written, e.g. `%1$'x-10.2A`.
    pub raw: String,
    /// The 1-based argument number of an explicit `argnum$` reference.
    pub argnum: Option<usize>,
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub conversion: char,
}

impl Specifier {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self.conversion {
            '%' => Kind::Percent,
            c if NATIVE_CONVERSIONS.contains(&c) => Kind::Native,
            c => Extension::from_conversion(c).map_or(Kind::Unknown, Kind::Extended),
        }
    }

    /// Returns `true` if this specifier refers to an argument by number (`%N$...`).
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.argnum.is_some()
    }

    /// Returns `true` if this specifier consumes an argument when formatting.
    #[must_use]
    pub fn takes_argument(&self) -> bool {
        self.kind() != Kind::Percent
    }

    /// The specifier with its conversion replaced by `%s` and wrapped in the decoration
    /// of `extension`, keeping every modifier.
    ///
    /// # Examples
    /// ```
    /// use sprintf_sql::spec::{tokenize, Extension, Token};
    /// let tokens = tokenize("%-'x10A");
    /// let Token::Specifier(spec) = &tokens[0].inner else { unreachable!() };
    /// assert_eq!(spec.rewrite(Extension::SingleQuoted), "'%-'x10s'");
    /// ```
    #[must_use]
    pub fn rewrite(&self, extension: Extension) -> String {
        let head = &self.raw[..self.raw.len() - self.conversion.len_utf8()];
        match extension.decoration() {
            Some(quote) => format!("{quote}{head}s{quote}"),
            None => format!("{head}s"),
        }
    }
}

impl std::fmt::Display for Specifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A piece of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token<'a> {
    /// Text without any `%`.
    Literal(&'a str),
    /// `%%`.
    Percent,
    Specifier(Specifier),
    /// A `%` at the end of the template that is not followed by a conversion.
    Dangling(&'a str),
}

impl Token<'_> {
    #[must_use]
    pub fn as_specifier(&self) -> Option<&Specifier> {
        match self {
            Self::Specifier(spec) => Some(spec),
            _ => None,
        }
    }
}

/// All specifiers of `template` in template order.
pub fn specifiers(template: &str) -> impl Iterator<Item = Spanned<Specifier>> + '_ {
    tokenize(template)
        .into_iter()
        .filter_map(|token| match token.inner {
            Token::Specifier(spec) => Some(Spanned::new(token.span, spec)),
            _ => None,
        })
}

pub mod parser {
    //! Winnow grammar for templates.
    use super::{Flags, Specifier, Token};
    use crate::diagnostics::Spanned;
    use winnow::ascii::digit1;
    use winnow::combinator::{alt, opt, preceded, repeat, terminated};
    use winnow::error::InputError;
    use winnow::prelude::*;
    use winnow::token::{any, take_while};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Flag {
        LeftAlign,
        AlwaysSign,
        Pad(char),
    }

    fn literal<'a>(s: &mut &'a str) -> ModalResult<&'a str, InputError<&'a str>> {
        take_while(1.., |c| c != '%')
            .context("literal")
            .parse_next(s)
    }

    fn number<'a>(s: &mut &'a str) -> ModalResult<usize, InputError<&'a str>> {
        digit1
            .map(|digits: &str| {
                digits.bytes().fold(0usize, |acc, digit| {
                    acc.saturating_mul(10)
                        .saturating_add(usize::from(digit - b'0'))
                })
            })
            .context("number")
            .parse_next(s)
    }

    fn flag<'a>(s: &mut &'a str) -> ModalResult<Flag, InputError<&'a str>> {
        alt((
            "-".value(Flag::LeftAlign),
            "+".value(Flag::AlwaysSign),
            " ".value(Flag::Pad(' ')),
            "0".value(Flag::Pad('0')),
            preceded("'", any).map(Flag::Pad),
        ))
        .context("flag")
        .parse_next(s)
    }

    fn flags<'a>(s: &mut &'a str) -> ModalResult<Flags, InputError<&'a str>> {
        repeat(0.., flag)
            .fold(Flags::default, |mut flags, flag| {
                match flag {
                    Flag::LeftAlign => flags.left_align = true,
                    Flag::AlwaysSign => flags.always_sign = true,
                    Flag::Pad(pad) => flags.pad = pad,
                }
                flags
            })
            .context("flags")
            .parse_next(s)
    }

    /// Parse a single specifier starting at `%`.
    pub fn specifier<'a>(s: &mut &'a str) -> ModalResult<Specifier, InputError<&'a str>> {
        let ((_, argnum, flags, width, precision, conversion), raw) = (
            "%",
            opt(terminated(number, "$")),
            flags,
            opt(number),
            opt(preceded(".", opt(number).map(Option::unwrap_or_default))),
            any,
        )
            .with_taken()
            .context("specifier")
            .parse_next(s)?;
        Ok(Specifier {
            raw: raw.to_string(),
            argnum,
            flags,
            width,
            precision,
            conversion,
        })
    }

    fn token<'a>(s: &mut &'a str) -> ModalResult<Token<'a>, InputError<&'a str>> {
        alt((
            literal.map(Token::Literal),
            "%%".value(Token::Percent),
            specifier.map(Token::Specifier),
        ))
        .context("token")
        .parse_next(s)
    }

    /// Split `template` into literal text, `%%` and specifiers.
    ///
    /// Never fails: a trailing `%` without a conversion becomes [`Token::Dangling`].
    ///
    /// # Examples
    /// ```
    /// use sprintf_sql::spec::{tokenize, Token};
    /// let tokens = tokenize("id=%d");
    /// assert_eq!(tokens[0].inner, Token::Literal("id="));
    /// assert_eq!(tokens[1].span, 3..5);
    /// ```
    #[must_use]
    pub fn tokenize(template: &str) -> Vec<Spanned<Token<'_>>> {
        let mut rest = template;
        let mut tokens = vec![];
        while !rest.is_empty() {
            let start = template.len() - rest.len();
            let token = token.parse_next(&mut rest).unwrap_or_else(|_| {
                rest = "";
                Token::Dangling(&template[start..])
            });
            let end = template.len() - rest.len();
            tokens.push(Spanned::new(start..end, token));
        }
        tokens
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use similar_asserts::assert_eq as sim_assert_eq;

        #[test]
        fn parses_specifier_modifiers() {
            crate::tests::init();
            sim_assert_eq!(
                specifier.parse("%1$'x-10.2A"),
                Ok(Specifier {
                    raw: "%1$'x-10.2A".to_string(),
                    argnum: Some(1),
                    flags: Flags {
                        left_align: true,
                        always_sign: false,
                        pad: 'x',
                    },
                    width: Some(10),
                    precision: Some(2),
                    conversion: 'A',
                })
            );

            let spec = specifier.parse("%05d").expect("valid specifier");
            sim_assert_eq!(spec.argnum, None);
            sim_assert_eq!(spec.flags.pad, '0');
            sim_assert_eq!(spec.width, Some(5));

            let spec = specifier.parse("%+.f").expect("valid specifier");
            assert!(spec.flags.always_sign);
            sim_assert_eq!(spec.precision, Some(0));
            sim_assert_eq!(spec.conversion, 'f');

            let spec = specifier.parse("%0$s").expect("valid specifier");
            sim_assert_eq!(spec.argnum, Some(0));
        }

        #[test]
        fn splits_templates_into_tokens() {
            crate::tests::init();
            let tokens = tokenize("100%% of %s, 50% off%");
            let kinds: Vec<_> = tokens
                .iter()
                .map(|token| (token.span.clone(), token.inner.clone()))
                .collect();
            sim_assert_eq!(
                kinds,
                vec![
                    (0..3, Token::Literal("100")),
                    (3..5, Token::Percent),
                    (5..9, Token::Literal(" of ")),
                    (9..11, Token::Specifier(specifier.parse("%s").unwrap())),
                    (11..15, Token::Literal(", 50")),
                    (15..18, Token::Specifier(specifier.parse("% o").unwrap())),
                    (18..20, Token::Literal("ff")),
                    (20..21, Token::Dangling("%")),
                ]
            );
        }

        #[test]
        fn keeps_unicode_literals_intact() {
            crate::tests::init();
            let tokens = tokenize("größe=%'€8s");
            sim_assert_eq!(tokens.len(), 2);
            sim_assert_eq!(tokens[0].inner, Token::Literal("größe="));
            let spec = tokens[1].as_specifier().expect("specifier");
            sim_assert_eq!(spec.flags.pad, '€');
            sim_assert_eq!(spec.width, Some(8));
        }
    }
}
