//! Configuration parser
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! config    := statement*
//! statement := token+ (';' | block)
//! block     := '{' statement* '}'
//! ```
//!
//! Each block is parsed by one call of `parse_block`, which runs a two-state
//! machine and recurses when a statement opens a nested block.

use crate::parser::ast::{Config, Statement};
use crate::parser::lexer::{LexError, Location, Spanned, Token, Tokenizer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default limit on block nesting
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Hard ceiling on block nesting. Each nested block is one recursive call,
/// so larger limits are clamped to keep the parse within the thread stack.
pub const MAX_DEPTH_LIMIT: usize = 256;

/// Parser error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),

    #[error("Empty statement at position {at}: ';' must follow at least one token")]
    EmptyStatement { at: Location },

    #[error("Block at position {at} must follow at least one token")]
    BlockWithoutDirective { at: Location },

    #[error("Unexpected '}}' at position {at}: no block is open")]
    UnexpectedCloseBrace { at: Location },

    #[error("Statement starting at position {at} is missing its terminator")]
    MissingTerminator { at: Location },

    #[error("Block opened at position {at} is never closed")]
    UnclosedBlock { at: Location },

    #[error("Block at position {at} exceeds the nesting limit of {limit}")]
    NestingTooDeep { at: Location, limit: usize },
}

impl ParseError {
    /// Where in the source the error was detected
    pub fn location(&self) -> Location {
        match self {
            ParseError::Lex(e) => e.location(),
            ParseError::EmptyStatement { at }
            | ParseError::BlockWithoutDirective { at }
            | ParseError::UnexpectedCloseBrace { at }
            | ParseError::MissingTerminator { at }
            | ParseError::UnclosedBlock { at }
            | ParseError::NestingTooDeep { at, .. } => *at,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parser options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum block nesting; the root block is depth 0. Values above
    /// `MAX_DEPTH_LIMIT` are clamped.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parser state within one block
#[derive(Debug)]
enum ParseState {
    /// Start of a statement, or end of the current block
    ExpectTokenOrBraceOrEnd,

    /// At least one token of the current statement seen
    InStatementTokens { tokens: Vec<String>, start: Location },
}

/// Parser state
pub struct Parser<'src> {
    tokens: Tokenizer<'src>,
    options: ParseOptions,
}

impl<'src> Parser<'src> {
    /// Create a new parser from source code
    pub fn new(source: &'src str) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: &'src str, mut options: ParseOptions) -> Self {
        options.max_depth = options.max_depth.min(MAX_DEPTH_LIMIT);
        Self {
            tokens: Tokenizer::new(source),
            options,
        }
    }

    /// Parse the whole source. Consumes the parser; the token stream
    /// cannot be restarted.
    pub fn parse(mut self) -> ParseResult<Config> {
        let config = self.parse_block(0, None)?;
        tracing::debug!(statements = config.len(), "parsed configuration");
        Ok(config)
    }

    /// Parse statements until the block closes. `opened_at` is the location
    /// of the `{` that opened this block, `None` for the root.
    fn parse_block(&mut self, depth: usize, opened_at: Option<Location>) -> ParseResult<Config> {
        let mut block = Config::new();
        let mut state = ParseState::ExpectTokenOrBraceOrEnd;

        loop {
            let next = self.tokens.next().transpose()?;

            state = match (state, next) {
                (ParseState::ExpectTokenOrBraceOrEnd, Some(Spanned { value, span })) => match value {
                    Token::BareWord(text) | Token::QuotedString { text, .. } => {
                        ParseState::InStatementTokens {
                            tokens: vec![text],
                            start: span,
                        }
                    }
                    Token::Semicolon => return Err(ParseError::EmptyStatement { at: span }),
                    Token::OpenBrace => return Err(ParseError::BlockWithoutDirective { at: span }),
                    Token::CloseBrace if opened_at.is_some() => {
                        tracing::trace!(depth, statements = block.len(), "closed block");
                        return Ok(block);
                    }
                    Token::CloseBrace => return Err(ParseError::UnexpectedCloseBrace { at: span }),
                },

                (ParseState::InStatementTokens { mut tokens, start }, Some(Spanned { value, span })) => {
                    match value {
                        Token::BareWord(text) | Token::QuotedString { text, .. } => {
                            tokens.push(text);
                            ParseState::InStatementTokens { tokens, start }
                        }
                        Token::Semicolon => {
                            block.statements.push(Statement::new(tokens));
                            ParseState::ExpectTokenOrBraceOrEnd
                        }
                        Token::OpenBrace => {
                            let child = self.parse_child(depth + 1, span)?;
                            block.statements.push(Statement::new(tokens).with_block(child));
                            ParseState::ExpectTokenOrBraceOrEnd
                        }
                        Token::CloseBrace => return Err(ParseError::MissingTerminator { at: start }),
                    }
                }

                (ParseState::ExpectTokenOrBraceOrEnd, None) => {
                    return match opened_at {
                        Some(at) => Err(ParseError::UnclosedBlock { at }),
                        None => Ok(block),
                    };
                }

                (ParseState::InStatementTokens { start, .. }, None) => {
                    return Err(ParseError::MissingTerminator { at: start });
                }
            };
        }
    }

    fn parse_child(&mut self, depth: usize, opened_at: Location) -> ParseResult<Config> {
        if depth > self.options.max_depth {
            return Err(ParseError::NestingTooDeep {
                at: opened_at,
                limit: self.options.max_depth,
            });
        }
        self.parse_block(depth, Some(opened_at))
    }
}

/// Parse a configuration source string
pub fn parse(source: &str) -> ParseResult<Config> {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "foo \"bar\";\nserver {\n  listen 80;\n  server_name foo.com;\n  root /home/ubuntu/sites/foo/;\n}\n";

    #[test]
    fn test_parse_empty() {
        let config = parse("").unwrap();
        assert!(config.is_empty());

        let config = parse("  \n# only a comment\n\t\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_parse_example() {
        let config = parse(EXAMPLE).unwrap();
        assert_eq!(config.len(), 2);

        let foo = &config.statements[0];
        assert_eq!(foo.tokens, ["foo", "\"bar\""]);
        assert!(foo.child_block.is_none());

        let server = &config.statements[1];
        assert_eq!(server.tokens, ["server"]);
        let block = server.child_block().unwrap();
        assert_eq!(block.statements[0].tokens, ["listen", "80"]);
        assert_eq!(block.statements[1].tokens, ["server_name", "foo.com"]);
        assert_eq!(block.statements[2].tokens, ["root", "/home/ubuntu/sites/foo/"]);

        assert_eq!(config.render(0), EXAMPLE);
    }

    #[test]
    fn test_parse_nested_blocks() {
        let config = parse("http { server { location / { } } upstream app { server a:1; } }").unwrap();
        let http = config.statements[0].child_block().unwrap();
        assert_eq!(http.len(), 2);

        let server = http.statements[0].child_block().unwrap();
        let location = &server.statements[0];
        assert_eq!(location.tokens, ["location", "/"]);
        assert!(location.child_block().unwrap().is_empty());

        let upstream = &http.statements[1];
        assert_eq!(upstream.args(), ["app"]);
        assert_eq!(upstream.child_block().unwrap().statements[0].tokens, ["server", "a:1"]);
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(
            parse("foo;\n;").unwrap_err(),
            ParseError::EmptyStatement { at: Location { start: 5, end: 6 } }
        );
        assert!(matches!(parse("server { };"), Err(ParseError::EmptyStatement { .. })));
    }

    #[test]
    fn test_block_without_directive() {
        assert_eq!(
            parse("{}").unwrap_err(),
            ParseError::BlockWithoutDirective { at: Location { start: 0, end: 1 } }
        );
        assert!(matches!(parse("a {{ b; }}"), Err(ParseError::BlockWithoutDirective { .. })));
    }

    #[test]
    fn test_unexpected_close_brace() {
        assert!(matches!(parse("}"), Err(ParseError::UnexpectedCloseBrace { .. })));
        assert_eq!(
            parse("a { b; } }").unwrap_err(),
            ParseError::UnexpectedCloseBrace { at: Location { start: 9, end: 10 } }
        );
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(
            parse("server {\n  listen 80\n}").unwrap_err(),
            ParseError::MissingTerminator { at: Location { start: 11, end: 17 } }
        );
        assert!(matches!(parse("foo bar"), Err(ParseError::MissingTerminator { .. })));
    }

    #[test]
    fn test_unclosed_block() {
        assert_eq!(
            parse("http {\n  server {\n  }\n").unwrap_err(),
            ParseError::UnclosedBlock { at: Location { start: 5, end: 6 } }
        );
    }

    #[test]
    fn test_lex_error_propagates() {
        let err = parse("foo \"bar\"baz;").unwrap_err();
        assert!(matches!(err, ParseError::Lex(LexError::QuotedTokenNotSeparated { .. })));
        assert_eq!(err.location(), Location { start: 9, end: 10 });
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions { max_depth: 2 };
        assert!(Parser::with_options("a { b { c; } }", options.clone()).parse().is_ok());

        let err = Parser::with_options("a { b { c { d; } } }", options).parse().unwrap_err();
        assert_eq!(err, ParseError::NestingTooDeep {
            at: Location { start: 10, end: 11 },
            limit: 2,
        });
    }

    #[test]
    fn test_default_nesting_limit() {
        let depth = DEFAULT_MAX_DEPTH;
        let source = format!("{}x;{}", "a {".repeat(depth), "}".repeat(depth));
        assert!(parse(&source).is_ok());

        let source = format!("{}x;{}", "a {".repeat(depth + 1), "}".repeat(depth + 1));
        assert!(matches!(parse(&source), Err(ParseError::NestingTooDeep { .. })));
    }

    #[test]
    fn test_nesting_limit_is_clamped() {
        let depth = 200_000;
        let source = format!("{}x;{}", "a {".repeat(depth), "}".repeat(depth));
        let options = ParseOptions { max_depth: usize::MAX };

        let err = Parser::with_options(&source, options).parse().unwrap_err();
        assert!(matches!(err, ParseError::NestingTooDeep { limit: MAX_DEPTH_LIMIT, .. }));

        let source = format!("{}x;{}", "a {".repeat(MAX_DEPTH_LIMIT), "}".repeat(MAX_DEPTH_LIMIT));
        let options = ParseOptions { max_depth: usize::MAX };
        assert!(Parser::with_options(&source, options).parse().is_ok());
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: ParseOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ParseOptions::default());
    }
}
