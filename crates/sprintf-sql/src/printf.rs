//! A `printf` formatting engine for [`Value`] arguments.
//!
//! Conversions follow the classic scripting-language `sprintf`:
//!
//! | Conversion | Output |
//! |---|---|
//! | `b` `o` `x` `X` | binary, octal, hexadecimal of the 64-bit two's complement |
//! | `c` | the character of the integer's low byte, width is ignored |
//! | `d` | signed decimal |
//! | `u` | unsigned decimal of the 64-bit two's complement |
//! | `e` `E` | scientific notation, e.g. `1.234560e+3` |
//! | `f` `F` | fixed notation |
//! | `g` `G` | the shorter of fixed and scientific notation |
//! | `s` | text, precision truncates |
//!
//! Positional references (`%2$s`) do not advance the sequential argument counter.
use crate::diagnostics::{Span, ToDiagnostics};
use crate::spec::{self, Kind, Specifier, Token};
use crate::value::Value;
use codespan_reporting::diagnostic::{Diagnostic, Label};

/// Largest accepted width, precision and argument number.
pub const MAX_MODIFIER: usize = i32::MAX as usize;

/// Float precision used when a specifier has none.
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Float precision is truncated to this many digits.
pub const MAX_FLOAT_PRECISION: usize = 53;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("the arguments array must contain {required} items, {given} given")]
    TooFewArguments { required: usize, given: usize },
    #[error("unknown format specifier {conversion:?}")]
    UnknownSpecifier { conversion: char, span: Span },
    #[error("missing format specifier at end of string")]
    MissingSpecifier { span: Span },
    #[error("argument number must be greater than zero and less than {}", MAX_MODIFIER)]
    InvalidArgumentNumber { span: Span },
    #[error("width must be less than {}", MAX_MODIFIER)]
    WidthOutOfRange { span: Span },
    #[error("precision must be less than {}", MAX_MODIFIER)]
    PrecisionOutOfRange { span: Span },
}

impl Error {
    /// Byte range of the offending specifier in the format string.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::TooFewArguments { .. } => None,
            Self::UnknownSpecifier { span, .. }
            | Self::MissingSpecifier { span }
            | Self::InvalidArgumentNumber { span }
            | Self::WidthOutOfRange { span }
            | Self::PrecisionOutOfRange { span } => Some(span.clone()),
        }
    }
}

impl ToDiagnostics for Error {
    fn to_diagnostics<F: Copy + PartialEq>(&self, file_id: F) -> Vec<Diagnostic<F>> {
        let label = match self {
            Self::TooFewArguments { .. } => None,
            Self::UnknownSpecifier { conversion, span } => Some(
                Label::primary(file_id, span.clone())
                    .with_message(format!("{conversion:?} is not a conversion")),
            ),
            Self::MissingSpecifier { span } => {
                Some(Label::primary(file_id, span.clone()).with_message("expected a conversion"))
            }
            Self::InvalidArgumentNumber { span } => Some(
                Label::primary(file_id, span.clone()).with_message("arguments are numbered from 1"),
            ),
            Self::WidthOutOfRange { span } | Self::PrecisionOutOfRange { span } => {
                Some(Label::primary(file_id, span.clone()))
            }
        };
        vec![Diagnostic::error()
            .with_message(self.to_string())
            .with_labels(label.into_iter().collect())]
    }
}

/// Format `args` according to `format`.
///
/// The template is validated and the number of required arguments is checked before
/// anything is formatted.
///
/// # Errors
/// - [`Error::TooFewArguments`] when `args` has fewer items than the template refers to.
/// - [`Error::UnknownSpecifier`], [`Error::MissingSpecifier`],
///   [`Error::InvalidArgumentNumber`], [`Error::WidthOutOfRange`] and
///   [`Error::PrecisionOutOfRange`] for malformed templates.
///
/// # Examples
/// ```
/// use sprintf_sql::{printf::vsprintf, Value};
/// let formatted = vsprintf("%05.1f|%-4s|%2$s", &[Value::from(1.23456), Value::from("ab")]);
/// assert_eq!(formatted.as_deref(), Ok("001.2|ab  |ab"));
/// ```
pub fn vsprintf(format: &str, args: &[Value]) -> Result<String, Error> {
    let tokens = spec::tokenize(format);
    let required = required_arguments(&tokens)?;
    if args.len() < required {
        return Err(Error::TooFewArguments {
            required,
            given: args.len(),
        });
    }

    let mut out = String::with_capacity(format.len());
    let mut next = 0;
    for token in &tokens {
        match &token.inner {
            Token::Literal(text) => out.push_str(text),
            Token::Percent => out.push('%'),
            Token::Dangling(_) => {
                return Err(Error::MissingSpecifier {
                    span: token.span.clone(),
                })
            }
            Token::Specifier(spec) if spec.kind() == Kind::Percent => out.push('%'),
            Token::Specifier(spec) => {
                let index = match spec.argnum {
                    Some(argnum) => argnum.saturating_sub(1),
                    None => {
                        next += 1;
                        next - 1
                    }
                };
                let value = args.get(index).ok_or(Error::TooFewArguments {
                    required,
                    given: args.len(),
                })?;
                format_value(&mut out, spec, value);
            }
        }
    }
    Ok(out)
}

/// Validate `tokens` and compute the number of arguments they consume.
fn required_arguments(tokens: &[crate::diagnostics::Spanned<Token<'_>>]) -> Result<usize, Error> {
    let mut required = 0;
    let mut sequential = 0;
    for token in tokens {
        let span = token.span.clone();
        let spec = match &token.inner {
            Token::Dangling(_) => return Err(Error::MissingSpecifier { span }),
            Token::Specifier(spec) => spec,
            Token::Literal(_) | Token::Percent => continue,
        };
        if spec.argnum.is_some_and(|argnum| argnum == 0 || argnum >= MAX_MODIFIER) {
            return Err(Error::InvalidArgumentNumber { span });
        }
        if spec.width.is_some_and(|width| width >= MAX_MODIFIER) {
            return Err(Error::WidthOutOfRange { span });
        }
        if spec.precision.is_some_and(|precision| precision >= MAX_MODIFIER) {
            return Err(Error::PrecisionOutOfRange { span });
        }
        match spec.kind() {
            Kind::Percent => continue,
            Kind::Native => {}
            Kind::Extended(_) | Kind::Unknown => {
                return Err(Error::UnknownSpecifier {
                    conversion: spec.conversion,
                    span,
                })
            }
        }
        match spec.argnum {
            Some(argnum) => required = required.max(argnum),
            None => {
                sequential += 1;
                required = required.max(sequential);
            }
        }
    }
    Ok(required)
}

fn format_value(out: &mut String, spec: &Specifier, value: &Value) {
    match spec.conversion {
        's' => {
            let text = value.to_text();
            match spec.precision {
                Some(precision) => {
                    let truncated: String = text.chars().take(precision).collect();
                    pad(out, "", &truncated, spec);
                }
                None => pad(out, "", &text, spec),
            }
        }
        'd' => {
            let number = value.to_int();
            let sign = if number < 0 {
                "-"
            } else if spec.flags.always_sign {
                "+"
            } else {
                ""
            };
            pad(out, sign, &number.unsigned_abs().to_string(), spec);
        }
        'u' => pad(out, "", &unsigned(value).to_string(), spec),
        'b' => pad(out, "", &format!("{:b}", unsigned(value)), spec),
        'o' => pad(out, "", &format!("{:o}", unsigned(value)), spec),
        'x' => pad(out, "", &format!("{:x}", unsigned(value)), spec),
        'X' => pad(out, "", &format!("{:X}", unsigned(value)), spec),
        'c' => {
            // only the low byte is used
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let byte = value.to_int() as u8;
            out.push(char::from(byte));
        }
        conversion @ ('e' | 'E' | 'f' | 'F' | 'g' | 'G') => {
            format_float(out, spec, conversion, value.to_float());
        }
        // rejected before formatting
        _ => {}
    }
}

#[allow(clippy::cast_sign_loss)]
fn unsigned(value: &Value) -> u64 {
    value.to_int() as u64
}

fn format_float(out: &mut String, spec: &Specifier, conversion: char, value: f64) {
    let precision = match spec.precision {
        None => DEFAULT_FLOAT_PRECISION,
        Some(precision) if precision > MAX_FLOAT_PRECISION => {
            tracing::warn!(
                precision,
                max = MAX_FLOAT_PRECISION,
                "requested float precision was truncated"
            );
            MAX_FLOAT_PRECISION
        }
        Some(precision) => precision,
    };

    let negative = value < 0.0;
    let sign = if negative {
        "-"
    } else if spec.flags.always_sign {
        "+"
    } else {
        ""
    };

    if value.is_nan() {
        return pad(out, "", "NaN", spec);
    }
    if value.is_infinite() {
        return pad(out, sign, "Inf", spec);
    }

    let magnitude = value.abs();
    let body = match conversion {
        'e' | 'E' => exponential(magnitude, precision, conversion),
        'g' => general(magnitude, precision, 'e'),
        'G' => general(magnitude, precision, 'E'),
        _ => format!("{magnitude:.precision$}"),
    };
    pad(out, sign, &body, spec);
}

/// Scientific notation with an explicit exponent sign and no exponent padding.
fn exponential(value: f64, precision: usize, exp_char: char) -> String {
    let (mantissa, exponent) = decompose(value, precision);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}{exp_char}{sign}{}", exponent.unsigned_abs())
}

/// Split `value` into a mantissa with `precision` fractional digits and a decimal exponent.
fn decompose(value: f64, precision: usize) -> (String, i64) {
    let formatted = format!("{value:.precision$e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_string(), exponent.parse().unwrap_or(0)),
        None => (formatted, 0),
    }
}

/// Shortest representation of the non-negative `value` with at most `precision`
/// significant digits.
///
/// Scientific notation is used when the decimal exponent is below `-4` or not smaller
/// than `precision`. A single-digit mantissa keeps a `.0` fraction, e.g. `1.0e+20`.
pub(crate) fn general(value: f64, precision: usize, exp_char: char) -> String {
    let precision = precision.max(1);
    let (mantissa, exponent) = decompose(value, precision - 1);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        digits => digits,
    };
    // position of the decimal point relative to the first digit
    let point = exponent + 1;

    if point > i64::try_from(precision).unwrap_or(i64::MAX) || point < -3 {
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() { "0" } else { rest };
        let exponent = point - 1;
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{first}.{rest}{exp_char}{sign}{}", exponent.unsigned_abs());
    }

    match usize::try_from(point) {
        Err(_) => {
            let zeros = "0".repeat(point.unsigned_abs().try_into().unwrap_or(0));
            format!("0.{zeros}{digits}")
        }
        Ok(point) if digits.len() <= point => {
            format!("{digits}{}", "0".repeat(point - digits.len()))
        }
        Ok(point) => {
            let (integer, fraction) = digits.split_at(point);
            let integer = if integer.is_empty() { "0" } else { integer };
            format!("{integer}.{fraction}")
        }
    }
}

/// Write `sign` and `body`, padded to the specifier's width.
///
/// Zero padding goes between the sign and the digits.
fn pad(out: &mut String, sign: &str, body: &str, spec: &Specifier) {
    let len = sign.chars().count() + body.chars().count();
    let padding = spec.width.unwrap_or(0).saturating_sub(len);
    let fill = std::iter::repeat(spec.flags.pad).take(padding);
    if spec.flags.left_align {
        out.push_str(sign);
        out.push_str(body);
        out.extend(fill);
    } else if spec.flags.pad == '0' && !sign.is_empty() {
        out.push_str(sign);
        out.extend(fill);
        out.push_str(body);
    } else {
        out.extend(fill);
        out.push_str(sign);
        out.push_str(body);
    }
}

#[cfg(test)]
mod tests {
    use super::{general, vsprintf, Error};
    use crate::diagnostics::{DiagnosticExt, ToDiagnostics};
    use crate::Value;
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;

    fn format(template: &str, args: &[Value]) -> eyre::Result<String> {
        Ok(vsprintf(template, args)?)
    }

    #[test]
    fn formats_strings() -> eyre::Result<()> {
        crate::tests::init();
        let abc = [Value::from("abc")];
        sim_assert_eq!(format("[%s]", &abc)?, "[abc]");
        sim_assert_eq!(format("[%6s]", &abc)?, "[   abc]");
        sim_assert_eq!(format("[%-6s]", &abc)?, "[abc   ]");
        sim_assert_eq!(format("[%'*6s]", &abc)?, "[***abc]");
        sim_assert_eq!(format("[%-'*6s]", &abc)?, "[abc***]");
        sim_assert_eq!(format("[%06s]", &abc)?, "[000abc]");
        sim_assert_eq!(format("[%.2s]", &abc)?, "[ab]");
        sim_assert_eq!(format("[%5.1s]", &abc)?, "[    a]");
        sim_assert_eq!(format("[%2s]", &abc)?, "[abc]");
        sim_assert_eq!(format("[%4s]", &[Value::from("ü")])?, "[   ü]");
        sim_assert_eq!(format("[%s]", &[Value::Null])?, "[]");
        sim_assert_eq!(format("[%s]", &[Value::from(true)])?, "[1]");
        sim_assert_eq!(format("[%s]", &[Value::from(1.5)])?, "[1.5]");
        Ok(())
    }

    #[test]
    fn formats_integers() -> eyre::Result<()> {
        crate::tests::init();
        let args = vec![Value::from(42); 5];
        sim_assert_eq!(
            format("%5d|%-5d|%05d|%+d|%+05d", &args)?,
            "   42|42   |00042|+42|+0042"
        );
        sim_assert_eq!(format("%05d", &[Value::from(-42)])?, "-0042");
        sim_assert_eq!(format("%5d", &[Value::from(-42)])?, "  -42");
        sim_assert_eq!(format("%-5d|", &[Value::from(-42)])?, "-42  |");
        sim_assert_eq!(format("%d", &[Value::from("12abc")])?, "12");
        sim_assert_eq!(format("%d", &[Value::from(3.9)])?, "3");
        sim_assert_eq!(format("%d", &[Value::from(i64::MIN)])?, "-9223372036854775808");
        sim_assert_eq!(format("%u", &[Value::from(-1)])?, "18446744073709551615");
        Ok(())
    }

    #[test]
    fn formats_integers_in_other_bases() -> eyre::Result<()> {
        crate::tests::init();
        sim_assert_eq!(format("%b", &[Value::from(5)])?, "101");
        sim_assert_eq!(format("%o", &[Value::from(8)])?, "10");
        sim_assert_eq!(format("%x %X", &[Value::from(255), Value::from(255)])?, "ff FF");
        sim_assert_eq!(format("%08b", &[Value::from(5)])?, "00000101");
        sim_assert_eq!(format("%x", &[Value::from(-1)])?, "ffffffffffffffff");
        sim_assert_eq!(format("%c%c", &[Value::from(65), Value::from(321)])?, "AA");
        sim_assert_eq!(format("%5c", &[Value::from(65)])?, "A");
        Ok(())
    }

    #[test]
    fn formats_floats() -> eyre::Result<()> {
        crate::tests::init();
        sim_assert_eq!(format("%f", &[Value::from(1.5)])?, "1.500000");
        sim_assert_eq!(format("%5.1f", &[Value::from(1.23456)])?, "  1.2");
        sim_assert_eq!(format("%08.3f", &[Value::from(-1.23456)])?, "-001.235");
        sim_assert_eq!(format("%+.2F", &[Value::from(2.0)])?, "+2.00");
        sim_assert_eq!(format("%.0f", &[Value::from(7.2)])?, "7");
        sim_assert_eq!(format("%f", &[Value::from("2.5kg")])?, "2.500000");
        sim_assert_eq!(format("%.3e", &[Value::from(1234.5678)])?, "1.235e+3");
        sim_assert_eq!(format("%e", &[Value::from(0.000123)])?, "1.230000e-4");
        sim_assert_eq!(format("%E", &[Value::from(1234.5)])?, "1.234500E+3");
        sim_assert_eq!(format("%e", &[Value::from(0.0)])?, "0.000000e+0");
        sim_assert_eq!(format("%.0e", &[Value::from(3000.0)])?, "3e+3");
        Ok(())
    }

    #[test]
    fn formats_general_floats() -> eyre::Result<()> {
        crate::tests::init();
        sim_assert_eq!(format("%g", &[Value::from(0.000_012_34)])?, "1.234e-5");
        sim_assert_eq!(format("%g", &[Value::from(123_456_789.0)])?, "1.23457e+8");
        sim_assert_eq!(format("%g", &[Value::from(100_000.0)])?, "100000");
        sim_assert_eq!(format("%g", &[Value::from(0.001)])?, "0.001");
        sim_assert_eq!(format("%g", &[Value::from(-2.5)])?, "-2.5");
        sim_assert_eq!(format("%G", &[Value::from(1e-10)])?, "1.0E-10");
        sim_assert_eq!(format("%.0g", &[Value::from(35.0)])?, "4.0e+1");

        sim_assert_eq!(general(0.0, 14, 'E'), "0");
        sim_assert_eq!(general(0.5, 14, 'E'), "0.5");
        sim_assert_eq!(general(12.345, 14, 'E'), "12.345");
        sim_assert_eq!(general(1e20, 14, 'E'), "1.0E+20");
        sim_assert_eq!(general(1e14, 14, 'E'), "1.0E+14");
        sim_assert_eq!(general(1e13, 14, 'E'), "10000000000000");
        sim_assert_eq!(general(0.0001, 14, 'E'), "0.0001");
        sim_assert_eq!(general(0.00001, 14, 'E'), "1.0E-5");
        Ok(())
    }

    #[test]
    fn formats_special_floats() -> eyre::Result<()> {
        crate::tests::init();
        sim_assert_eq!(format("%f", &[Value::from(f64::NAN)])?, "NaN");
        sim_assert_eq!(format("%5.1f", &[Value::from(f64::NEG_INFINITY)])?, " -Inf");
        sim_assert_eq!(format("%05f", &[Value::from(f64::NEG_INFINITY)])?, "-0Inf");
        sim_assert_eq!(format("%+e", &[Value::from(f64::INFINITY)])?, "+Inf");
        Ok(())
    }

    #[test]
    fn truncates_float_precision() -> eyre::Result<()> {
        crate::tests::init();
        let formatted = format("%.60f", &[Value::from(1.0)])?;
        sim_assert_eq!(formatted, format!("1.{}", "0".repeat(53)));
        Ok(())
    }

    #[test]
    fn positional_references_do_not_advance() -> eyre::Result<()> {
        crate::tests::init();
        let args = [Value::from("a"), Value::from("b")];
        sim_assert_eq!(format("%2$s %1$s %s", &args)?, "b a a");
        sim_assert_eq!(format("%1$s %s %s", &args)?, "a a b");
        sim_assert_eq!(format("%1$'#4s|%1$-4s|", &args)?, "###a|a   |");
        Ok(())
    }

    #[test]
    fn formats_percent_signs() -> eyre::Result<()> {
        crate::tests::init();
        sim_assert_eq!(format("100%%", &[])?, "100%");
        sim_assert_eq!(format("%5%|%s", &[Value::from("x")])?, "%|x");
        sim_assert_eq!(format("no specifiers", &[Value::from("extra")])?, "no specifiers");
        Ok(())
    }

    #[test]
    fn rejects_missing_arguments_before_formatting() {
        crate::tests::init();
        sim_assert_eq!(
            vsprintf("%s %s", &[Value::from("a")]),
            Err(Error::TooFewArguments {
                required: 2,
                given: 1
            })
        );
        sim_assert_eq!(
            vsprintf("%s %3$s", &[Value::from("a"), Value::from("b")]),
            Err(Error::TooFewArguments {
                required: 3,
                given: 2
            })
        );
        sim_assert_eq!(
            Error::TooFewArguments {
                required: 3,
                given: 2
            }
            .to_string(),
            "the arguments array must contain 3 items, 2 given"
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        crate::tests::init();
        sim_assert_eq!(
            vsprintf("%0$s", &[Value::from("a")]),
            Err(Error::InvalidArgumentNumber { span: 0..4 })
        );
        sim_assert_eq!(
            vsprintf("a %y", &[Value::from("a")]),
            Err(Error::UnknownSpecifier {
                conversion: 'y',
                span: 2..4
            })
        );
        sim_assert_eq!(
            vsprintf("abc %", &[]),
            Err(Error::MissingSpecifier { span: 4..5 })
        );
        sim_assert_eq!(
            vsprintf("%99999999999s", &[Value::from("a")]),
            Err(Error::WidthOutOfRange { span: 0..13 })
        );
        // extended conversions must be rewritten first
        sim_assert_eq!(
            vsprintf("%A", &[Value::from("a")]),
            Err(Error::UnknownSpecifier {
                conversion: 'A',
                span: 0..2
            })
        );
    }

    #[test]
    fn errors_convert_to_diagnostics() {
        crate::tests::init();
        let error = Error::UnknownSpecifier {
            conversion: 'y',
            span: 2..4,
        };
        sim_assert_eq!(error.span(), Some(2..4));
        let diagnostics = error.to_diagnostics(0usize);
        sim_assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
        sim_assert_eq!(diagnostics[0].labels[0].range, 2..4);

        let diagnostics = Error::TooFewArguments {
            required: 1,
            given: 0,
        }
        .to_diagnostics(0usize);
        assert!(diagnostics[0].labels.is_empty());
    }
}
