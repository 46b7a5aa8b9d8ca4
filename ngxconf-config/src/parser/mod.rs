//! Parser module for nginx-style configuration files
//!
//! This module provides the lexer, the configuration tree, and the parser.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Config, Statement};
pub use lexer::{tokenize, LexError, Location, Quote, Spanned, Token, Tokenizer};
pub use parser::{parse, ParseError, ParseOptions, ParseResult, Parser, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
