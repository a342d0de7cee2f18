#![forbid(unsafe_code)]

mod logging;
mod options;

use clap::Parser;
use color_eyre::eyre::{self, WrapErr};
use sprintf_sql::{
    config::{self, Config},
    diagnostics::{lint, DiagnosticExt, Printer, StderrPrinter, ToDiagnostics},
    Options, Sprintf,
};

fn load_config(options: &options::Options, printer: &StderrPrinter) -> eyre::Result<Config> {
    if let Some(path) = &options.config_file {
        return Ok(config::load_config(path, printer)?);
    }
    let cwd = std::env::current_dir().wrap_err("could not determine current working dir")?;
    let dir = options.dir.clone().unwrap_or(cwd);
    match config::find_config(&dir, printer)? {
        Some((path, config)) => {
            tracing::info!(path = %path.display(), "using config file");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn explain(sprintf: &Sprintf) {
    println!("template:   {:?}", sprintf.template());
    for spec in sprintf.specifiers() {
        println!("sequential: {} at {:?}", spec.raw, spec.span);
    }
    for spec in sprintf.references() {
        println!("reference:  {} at {:?}", spec.raw, spec.span);
    }
    println!("escape:     {:?}", sprintf.escape_indices());
    println!("hex:        {:?}", sprintf.hex_indices());
}

fn main() -> eyre::Result<()> {
    if std::env::var("RUST_SPANTRACE").is_err() {
        std::env::set_var("RUST_SPANTRACE", "0");
    }

    let start = std::time::Instant::now();
    color_eyre::install()?;

    let mut options = options::Options::parse();
    options.fix();
    let color_choice = options.color_choice.unwrap_or(termcolor::ColorChoice::Auto);
    let log_level = options
        .log_level
        .or_else(|| options.verbosity.log_level());
    let (log_format, use_color) = logging::setup(log_level, options.log_format, color_choice)?;
    tracing::debug!(?log_format, use_color, "logging configured");

    let printer = Printer::stderr(Some(color_choice));
    let config = load_config(&options, &printer)?;
    let template = options::resolve_template(&mut options, &config)?;

    if options.check == Some(true) {
        let file_id = printer.add_source_file(template.name.as_str(), template.source.clone());
        let diagnostics = lint(&template.source, file_id);
        for diagnostic in &diagnostics {
            printer.emit(diagnostic)?;
        }
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            eyre::bail!("template {} has {errors} error(s)", template.name);
        }
        tracing::info!(elapsed = ?start.elapsed(), "checked template");
        return Ok(());
    }

    let defaults = Options::default();
    let sprintf_options = Options {
        strip_leading_whitespace: options
            .strip_leading_whitespace()
            .or(template.strip_leading_whitespace)
            .unwrap_or(defaults.strip_leading_whitespace),
    };
    let sprintf = Sprintf::with_options(template.source.as_str(), sprintf_options);

    if options.explain == Some(true) {
        explain(&sprintf);
        return Ok(());
    }

    let values = options.values();
    match sprintf.bind_values(values) {
        Ok(formatted) => {
            println!("{formatted}");
            tracing::info!(elapsed = ?start.elapsed(), "formatted template");
            Ok(())
        }
        Err(err) => {
            // spans refer to the rewritten template
            let file_id = printer.add_source_file(
                format!("{} (rewritten)", template.name),
                sprintf.template().to_string(),
            );
            for diagnostic in err.to_diagnostics(file_id) {
                printer.emit(&diagnostic)?;
            }
            Err(err).wrap_err_with(|| format!("failed to bind template {}", template.name))
        }
    }
}
