//! Static checks for templates that do not require arguments.
use crate::spec::{self, Kind, Token, EXTENDED_CONVERSIONS, NATIVE_CONVERSIONS};
use codespan_reporting::diagnostic::{Diagnostic, Label};

fn supported_conversions() -> String {
    NATIVE_CONVERSIONS
        .iter()
        .chain(EXTENDED_CONVERSIONS.iter())
        .map(|conversion| format!("`%{conversion}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check `template` for problems that would surface when binding it.
///
/// Errors are reported for a trailing `%`, `%0$` references and unknown conversions.
/// References to arguments no sequential specifier consumes are warnings, since the
/// caller must remember to pass them.
///
/// # Examples
/// ```
/// use sprintf_sql::diagnostics::{lint, DiagnosticExt};
/// let diagnostics = lint("SELECT %y FROM %T", 0usize);
/// assert_eq!(diagnostics.len(), 1);
/// assert!(diagnostics[0].is_error());
/// ```
#[must_use]
pub fn lint<F: Copy + PartialEq>(template: &str, file_id: F) -> Vec<Diagnostic<F>> {
    let tokens = spec::tokenize(template);
    let sequential = tokens
        .iter()
        .filter_map(|token| token.as_specifier())
        .filter(|spec| !spec.is_reference() && spec.takes_argument())
        .count();

    let mut diagnostics = vec![];
    for token in &tokens {
        let span = token.span.clone();
        let spec = match &token.inner {
            Token::Dangling(_) => {
                diagnostics.push(
                    Diagnostic::error()
                        .with_message("template ends inside a specifier")
                        .with_labels(vec![
                            Label::primary(file_id, span).with_message("expected a conversion")
                        ])
                        .with_notes(vec!["use `%%` for a literal percent sign".to_string()]),
                );
                continue;
            }
            Token::Specifier(spec) => spec,
            Token::Literal(_) | Token::Percent => continue,
        };

        match spec.kind() {
            Kind::Unknown => diagnostics.push(
                Diagnostic::error()
                    .with_message(format!("unknown conversion `%{}`", spec.conversion))
                    .with_labels(vec![Label::primary(file_id, span.clone())
                        .with_message("binding this template will fail")])
                    .with_notes(vec![format!(
                        "supported conversions are {}",
                        supported_conversions()
                    )]),
            ),
            Kind::Extended(_) if spec.conversion.is_ascii_lowercase() => diagnostics.push(
                Diagnostic::note()
                    .with_message(format!(
                        "`%{}` is escaped exactly like `%{}`",
                        spec.conversion,
                        spec.conversion.to_ascii_uppercase()
                    ))
                    .with_labels(vec![Label::secondary(file_id, span.clone())]),
            ),
            Kind::Native | Kind::Extended(_) | Kind::Percent => {}
        }

        match spec.argnum {
            Some(0) => diagnostics.push(
                Diagnostic::error()
                    .with_message("argument numbers start at 1")
                    .with_labels(vec![
                        Label::primary(file_id, span).with_message("refers to argument 0")
                    ]),
            ),
            Some(argnum) if argnum > sequential && spec.takes_argument() => diagnostics.push(
                Diagnostic::warning()
                    .with_message(format!(
                        "argument {argnum} is not consumed by a sequential specifier"
                    ))
                    .with_labels(vec![Label::primary(file_id, span)
                        .with_message(format!("binding requires at least {argnum} arguments"))]),
            ),
            _ => {}
        }
    }
    tracing::debug!(diagnostics = diagnostics.len(), "linted template");
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::lint;
    use crate::diagnostics::{BufferedPrinter, DiagnosticExt};
    use codespan_reporting::diagnostic::Severity;
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;

    fn summary(template: &str) -> Vec<(Severity, std::ops::Range<usize>)> {
        lint(template, 0usize)
            .into_iter()
            .map(|diagnostic| (diagnostic.severity, diagnostic.labels[0].range.clone()))
            .collect()
    }

    #[test]
    fn accepts_valid_templates() {
        crate::tests::init();
        assert!(lint("INSERT INTO %T (a, b) VALUES (%A, %H) -- 100%%", 0usize).is_empty());
        assert!(lint("%s %s %1$S %2$d", 0usize).is_empty());
        assert!(lint("", 0usize).is_empty());
    }

    #[test]
    fn reports_errors() {
        crate::tests::init();
        sim_assert_eq!(
            summary("SELECT %y, %0$s FROM t WHERE x LIKE 'a%"),
            vec![
                (Severity::Error, 7..9),
                (Severity::Error, 11..15),
                (Severity::Error, 38..39),
            ]
        );
        assert!(lint("%", 0usize).iter().all(DiagnosticExt::is_error));
    }

    #[test]
    fn warns_about_unowned_references() {
        crate::tests::init();
        sim_assert_eq!(
            summary("%s %3$A %5%"),
            vec![(Severity::Warning, 3..7)]
        );
        let diagnostics = lint("%s %3$A", 0usize);
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn notes_lowercase_conversions() {
        crate::tests::init();
        let diagnostics = lint("%a %Q %t", 0usize);
        sim_assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|diagnostic| diagnostic.severity == Severity::Note));
        sim_assert_eq!(diagnostics[0].message, "`%a` is escaped exactly like `%A`");
        sim_assert_eq!(diagnostics[1].labels[0].range, 6..8);
    }

    #[test]
    fn renders_with_source_context() -> eyre::Result<()> {
        crate::tests::init();
        let template = "SELECT *\nFROM %T\nWHERE id = %i";
        let printer = BufferedPrinter::default();
        let file_id = printer.add_source_file("query.sql", template.to_string());
        for diagnostic in lint(template, file_id) {
            printer.emit(&diagnostic)?;
        }
        let contents = printer.contents();
        assert!(contents.contains("unknown conversion `%i`"), "{contents}");
        assert!(contents.contains("query.sql:3:12"), "{contents}");
        Ok(())
    }
}
