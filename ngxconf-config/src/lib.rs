//! nginx-style configuration parser
//!
//! This crate parses nginx-style configuration files into a tree of
//! statements and renders the tree back to canonical text. Directive names
//! and arguments are opaque: `listen` and `server_name` are just tokens.
//!
//! # Example
//!
//! ```rust,ignore
//! use ngxconf_config::parse_file;
//!
//! let config = parse_file("/etc/nginx/nginx.conf")?;
//! for server in config.find("http").filter_map(|s| s.child_block()) {
//!     println!("{}", server.render(0));
//! }
//! ```

pub mod parser;
pub mod source;

pub use parser::{
    parse, tokenize,
    Config, Statement,
    Token, Quote, Tokenizer, LexError, Location, Spanned,
    Parser, ParseError, ParseOptions, ParseResult, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT,
};

pub use source::{read_source, SourceError};

use std::path::Path;

/// Load and parse a configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config, LoadError> {
    parse_file_with(path, &ParseOptions::default())
}

/// Load and parse a configuration file with explicit parser options
pub fn parse_file_with(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Config, LoadError> {
    let path = path.as_ref();
    let source = read_source(path)?;

    let config = Parser::with_options(&source, options.clone())
        .parse()
        .inspect_err(|e| tracing::debug!(path = %path.display(), error = %e, "config rejected"))?;

    Ok(config)
}

/// Error loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}
