//! ngxconf - validate, format and inspect nginx-style configuration files
//!
//! This is the main entry point for the ngxconf CLI.

use anyhow::Context;
use ariadne::{IndexType, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use ngxconf_config::{Config, ParseError, ParseOptions, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ngxconf - nginx-style configuration toolkit
#[derive(Parser)]
#[command(name = "ngxconf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Maximum block nesting depth
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH, value_parser = parse_max_depth)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

fn parse_max_depth(value: &str) -> Result<usize, String> {
    let depth: usize = value.parse().map_err(|e| format!("{e}"))?;
    if depth > MAX_DEPTH_LIMIT {
        return Err(format!("must be at most {MAX_DEPTH_LIMIT}"));
    }
    Ok(depth)
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        config: PathBuf,
    },

    /// Print a configuration file in canonical form
    Fmt {
        /// Path to the configuration file
        config: PathBuf,

        /// Exit with an error instead of printing when the file is not canonical
        #[arg(long)]
        check: bool,
    },

    /// Print the statement tree as JSON
    Dump {
        /// Path to the configuration file
        config: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries rendered configs and JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let options = ParseOptions {
        max_depth: cli.max_depth,
    };

    match cli.command {
        Commands::Validate { config: path } => {
            tracing::info!("Validating config: {}", path.display());
            let (_, config) = load_or_exit(&path, &options);
            println!(
                "✅ Configuration '{}' is valid! ({} top-level statements)",
                path.display(),
                config.len()
            );
        }

        Commands::Fmt { config: path, check } => {
            let (source, config) = load_or_exit(&path, &options);
            let rendered = config.render(0);

            if check {
                if source != rendered {
                    eprintln!("❌ '{}' is not in canonical form", path.display());
                    std::process::exit(1);
                }
                println!("✅ '{}' is already canonical", path.display());
            } else {
                print!("{}", rendered);
            }
        }

        Commands::Dump { config: path } => {
            let (_, config) = load_or_exit(&path, &options);
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration tree")?;
            println!("{}", json);
        }

        Commands::Version => {
            println!("ngxconf v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Read and parse `path`, printing a diagnostic and exiting on failure
fn load_or_exit(path: &Path, options: &ParseOptions) -> (String, Config) {
    let source = match ngxconf_config::read_source(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    match ngxconf_config::Parser::with_options(&source, options.clone()).parse() {
        Ok(config) => (source, config),
        Err(e) => {
            report_parse_error(&path.display().to_string(), &source, &e);
            std::process::exit(1);
        }
    }
}

/// Render a parse error with a source snippet
fn report_parse_error(name: &str, source: &str, error: &ParseError) {
    let span = error.location().range();

    let result = Report::build(ReportKind::Error, (name, span.clone()))
        .with_config(ariadne::Config::default().with_index_type(IndexType::Byte))
        .with_message(format!("Configuration Error: {}", error))
        .with_label(Label::new((name, span)).with_message(label(error)))
        .finish()
        .eprint((name, Source::from(source)));

    if let Err(e) = result {
        tracing::warn!("Failed to render diagnostic: {}", e);
        eprintln!("❌ Configuration Error: {}", error);
    }
}

fn label(error: &ParseError) -> &'static str {
    match error {
        ParseError::Lex(_) => "invalid token",
        ParseError::EmptyStatement { .. } => "statement has no tokens",
        ParseError::BlockWithoutDirective { .. } => "block needs a directive before it",
        ParseError::UnexpectedCloseBrace { .. } => "no block to close",
        ParseError::MissingTerminator { .. } => "expected ';' or '{' after this statement",
        ParseError::UnclosedBlock { .. } => "block opened here",
        ParseError::NestingTooDeep { .. } => "nested too deeply",
    }
}
