use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use sprintf_sql::config::Config;
use std::path::PathBuf;

pub trait Invert {
    fn invert(self) -> Self;
}

impl Invert for Option<bool> {
    fn invert(self) -> Self {
        self.map(|value| !value)
    }
}

/// Logging flags to `#[command(flatten)]` into your CLI
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct Verbosity {
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity",
        long_help = None,
    )]
    pub verbose: u8,

    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        help = "Decrease logging verbosity",
        long_help = None,
        conflicts_with = "verbose",
    )]
    pub quiet: u8,
}

impl Verbosity {
    /// Log level selected by the flags, `None` if nothing should be logged.
    ///
    /// Without flags, warnings are logged.
    #[must_use]
    pub fn log_level(&self) -> Option<tracing::metadata::Level> {
        use tracing::metadata::Level;
        let level = 1 + i16::from(self.verbose) - i16::from(self.quiet);
        match level {
            i16::MIN..=-1 => None,
            0 => Some(Level::ERROR),
            1 => Some(Level::WARN),
            2 => Some(Level::INFO),
            3 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "sprintf-sql",
    version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
    about = "format SQL statements with escaped and hex encoded literals",
    author = "romnn <contact@romnn.com>",
)]
pub struct Options {
    #[clap(
        long = "dir",
        help = "directory to look for a config file in",
        env = "SPRINTF_SQL_DIR"
    )]
    pub dir: Option<PathBuf>,

    #[clap(
        long = "config-file",
        help = "config file to read named templates and defaults from",
        env = "SPRINTF_SQL_CONFIG_FILE"
    )]
    pub config_file: Option<PathBuf>,

    #[arg(
        long = "color",
        env = "SPRINTF_SQL_COLOR",
        help = "enable or disable color"
    )]
    pub color_choice: Option<termcolor::ColorChoice>,

    #[command(flatten)]
    pub verbosity: Verbosity,

    #[arg(
        long = "log",
        env = "SPRINTF_SQL_LOG_LEVEL",
        aliases = ["log-level"],
        help = "Log level. When using a more sophisticated logging setup using RUST_LOG environment variable, this option is overwritten."
    )]
    pub log_level: Option<tracing::metadata::Level>,

    #[arg(
        long = "log-format",
        env = "SPRINTF_SQL_LOG_FORMAT",
        help = "log format (json, pretty or pretty-compact)"
    )]
    pub log_format: Option<crate::logging::LogFormat>,

    #[clap(
        short = 'n',
        long = "template-name",
        help = "use a named template from the config file",
        env = "SPRINTF_SQL_TEMPLATE_NAME",
        conflicts_with = "template_file"
    )]
    pub template_name: Option<String>,

    #[clap(
        short = 'f',
        long = "template-file",
        help = "read the template from a file",
        env = "SPRINTF_SQL_TEMPLATE_FILE"
    )]
    pub template_file: Option<PathBuf>,

    #[clap(
        long = "strip",
        help = "strip leading whitespace from every line of the template",
        env = "SPRINTF_SQL_STRIP",
        action = clap::ArgAction::SetTrue,
    )]
    pub strip: Option<bool>,

    #[clap(
        long = "no-strip",
        help = "keep leading whitespace of the template",
        env = "SPRINTF_SQL_NO_STRIP",
        action = clap::ArgAction::SetTrue,
        conflicts_with = "strip",
    )]
    pub no_strip: Option<bool>,

    #[clap(
        long = "check",
        help = "check the template for problems without binding it",
        env = "SPRINTF_SQL_CHECK",
        action = clap::ArgAction::SetTrue,
    )]
    pub check: Option<bool>,

    #[clap(
        long = "explain",
        help = "print the rewritten template and which arguments are escaped or hex encoded",
        env = "SPRINTF_SQL_EXPLAIN",
        action = clap::ArgAction::SetTrue,
        conflicts_with = "check",
    )]
    pub explain: Option<bool>,

    #[clap(
        long = "null-marker",
        help = "argument spelling that is bound as NULL",
        env = "SPRINTF_SQL_NULL_MARKER"
    )]
    pub null_marker: Option<String>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Options {
    /// Reset flags that were not given to `None`.
    ///
    /// clap v4 sets `Some(false)` for absent `clap::ArgAction::SetTrue` flags of type
    /// `Option<bool>`, and `--strip=false` is not accepted.
    pub fn fix(&mut self) {
        for flag in [
            &mut self.strip,
            &mut self.no_strip,
            &mut self.check,
            &mut self.explain,
        ] {
            if *flag != Some(true) {
                *flag = None;
            }
        }
    }

    /// Whether leading whitespace should be stripped, if set on the command line.
    #[must_use]
    pub fn strip_leading_whitespace(&self) -> Option<bool> {
        self.strip.or(self.no_strip.invert())
    }

    /// Convert the positional arguments to values.
    #[must_use]
    pub fn values(&self) -> Vec<sprintf_sql::Value> {
        self.args
            .iter()
            .map(|arg| match self.null_marker.as_deref() {
                Some(marker) if marker == arg => sprintf_sql::Value::Null,
                _ => sprintf_sql::Value::from(arg),
            })
            .collect()
    }
}

/// The template to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Name shown in diagnostics.
    pub name: String,
    pub source: String,
    pub strip_leading_whitespace: Option<bool>,
}

/// Select the template from `--template-name`, `--template-file` or the first argument.
///
/// The template is removed from `options.args`, so the remaining arguments are values.
///
/// # Errors
/// - If the named template is not configured.
/// - If the template file cannot be read.
/// - If no template is given.
pub fn resolve_template(options: &mut Options, config: &Config) -> eyre::Result<Template> {
    if let Some(name) = &options.template_name {
        let Some(template) = config.templates.get(name) else {
            eyre::bail!(
                "unknown template {name:?}, expected one of {:?}",
                config.templates.keys().collect::<Vec<_>>()
            );
        };
        return Ok(Template {
            name: name.clone(),
            source: template.template.clone(),
            strip_leading_whitespace: template
                .strip_leading_whitespace
                .or(config.strip_leading_whitespace),
        });
    }
    if let Some(path) = &options.template_file {
        let source = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read template file {}", path.display()))?;
        return Ok(Template {
            name: path.to_string_lossy().to_string(),
            source,
            strip_leading_whitespace: config.strip_leading_whitespace,
        });
    }
    if options.args.is_empty() {
        eyre::bail!("missing template");
    }
    let source = options.args.remove(0);
    Ok(Template {
        name: "<template>".to_string(),
        source,
        strip_leading_whitespace: config.strip_leading_whitespace,
    })
}

#[cfg(test)]
mod tests {
    use super::{resolve_template, Options, Template};
    use clap::Parser;
    use color_eyre::eyre;
    use similar_asserts::assert_eq as sim_assert_eq;
    use sprintf_sql::{config::Config, Value};

    fn config() -> eyre::Result<Config> {
        let mut diagnostics = vec![];
        let config = Config::from_toml(
            r#"
            strip_leading_whitespace = false

            [templates]
            select = "SELECT * FROM %T WHERE id = %d"
            insert = { template = "INSERT INTO t VALUES (%A)", strip_leading_whitespace = true }
            "#,
            0usize,
            &mut diagnostics,
        )?;
        assert!(diagnostics.is_empty());
        Ok(config)
    }

    #[test]
    fn first_argument_is_the_template() -> eyre::Result<()> {
        let mut options = Options::try_parse_from(["sprintf-sql", "%A-%d", "it's", "-3"])?;
        let template = resolve_template(&mut options, &config()?)?;
        sim_assert_eq!(
            template,
            Template {
                name: "<template>".to_string(),
                source: "%A-%d".to_string(),
                strip_leading_whitespace: Some(false),
            }
        );
        sim_assert_eq!(options.args, vec!["it's", "-3"]);
        Ok(())
    }

    #[test]
    fn named_templates_keep_all_arguments() -> eyre::Result<()> {
        let mut options = Options::try_parse_from(["sprintf-sql", "-n", "insert", "x"])?;
        let template = resolve_template(&mut options, &config()?)?;
        sim_assert_eq!(template.source, "INSERT INTO t VALUES (%A)");
        sim_assert_eq!(template.strip_leading_whitespace, Some(true));
        sim_assert_eq!(options.args, vec!["x"]);

        let mut options = Options::try_parse_from(["sprintf-sql", "-n", "missing"])?;
        assert!(resolve_template(&mut options, &config()?).is_err());
        Ok(())
    }

    #[test]
    fn missing_template_is_an_error() -> eyre::Result<()> {
        let mut options = Options::try_parse_from(["sprintf-sql"])?;
        assert!(resolve_template(&mut options, &Config::default()).is_err());
        Ok(())
    }

    #[test]
    fn maps_null_marker() -> eyre::Result<()> {
        let options =
            Options::try_parse_from(["sprintf-sql", "--null-marker", "NULL", "%s", "NULL", "a"])?;
        sim_assert_eq!(
            options.values(),
            vec![Value::from("%s"), Value::Null, Value::from("a")]
        );
        Ok(())
    }

    #[test]
    fn strip_flags() -> eyre::Result<()> {
        let mut options = Options::try_parse_from(["sprintf-sql", "--no-strip", "%s"])?;
        options.fix();
        sim_assert_eq!(options.strip_leading_whitespace(), Some(false));
        let mut options = Options::try_parse_from(["sprintf-sql", "--strip", "%s"])?;
        options.fix();
        sim_assert_eq!(options.strip_leading_whitespace(), Some(true));
        let mut options = Options::try_parse_from(["sprintf-sql", "%s"])?;
        options.fix();
        sim_assert_eq!(options.strip_leading_whitespace(), None);
        sim_assert_eq!(options.check, None);
        assert!(Options::try_parse_from(["sprintf-sql", "--strip", "--no-strip"]).is_err());
        Ok(())
    }

    #[test]
    fn verbosity_selects_log_level() -> eyre::Result<()> {
        use tracing::metadata::Level;
        let options = Options::try_parse_from(["sprintf-sql", "%s"])?;
        sim_assert_eq!(options.verbosity.log_level(), Some(Level::WARN));
        let options = Options::try_parse_from(["sprintf-sql", "-vv", "%s"])?;
        sim_assert_eq!(options.verbosity.log_level(), Some(Level::DEBUG));
        let options = Options::try_parse_from(["sprintf-sql", "-qq", "%s"])?;
        sim_assert_eq!(options.verbosity.log_level(), None);
        Ok(())
    }
}
