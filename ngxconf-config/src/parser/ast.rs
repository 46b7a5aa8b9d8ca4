//! Configuration tree
//!
//! A `Config` is an ordered list of statements; a statement is one or more
//! token texts optionally followed by a nested block:
//!
//! ```text
//! worker_processes 4;          # statement, no block
//! http {                       # statement with a child block
//!     server { listen 80; }
//! }
//! ```
//!
//! Token texts are stored as written, quoted tokens with their quotes.

use crate::parser::lexer::Quote;
use serde::Serialize;
use std::fmt;

/// Indentation per nesting level in rendered output
const INDENT: &str = "  ";

/// A block of statements. The root of a parsed file is a `Config` as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Config {
    pub statements: Vec<Statement>,
}

/// A single directive: `tokens...;` or `tokens... { child_block }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Never empty when produced by the parser. A statement built with no
    /// tokens has no source form and is skipped by `Config::render`, child
    /// block included.
    pub tokens: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_block: Option<Box<Config>>,
}

impl Statement {
    pub fn new(tokens: Vec<String>) -> Self {
        debug_assert!(!tokens.is_empty(), "statement without tokens");
        Self {
            tokens,
            child_block: None,
        }
    }

    pub fn with_block(mut self, block: Config) -> Self {
        self.child_block = Some(Box::new(block));
        self
    }

    /// First token, e.g. `listen` or `server`
    pub fn name(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }

    /// Tokens after the name
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn child_block(&self) -> Option<&Config> {
        self.child_block.as_deref()
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        if self.tokens.is_empty() {
            return;
        }
        for _ in 0..depth {
            out.push_str(INDENT);
        }
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            push_token(out, token);
        }

        match &self.child_block {
            Some(block) => {
                out.push_str(" {\n");
                block.render_into(out, depth + 1);
                for _ in 0..depth {
                    out.push_str(INDENT);
                }
                out.push_str("}\n");
            }
            None => out.push_str(";\n"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    /// Statements of this block whose name is `name`
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements.iter().filter(move |s| s.name() == name)
    }

    /// Render the block as canonical text, indented by `depth` levels.
    ///
    /// An empty block renders as the empty string.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        self.render_into(&mut out, depth);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        for statement in &self.statements {
            statement.render_into(out, depth);
        }
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(0))
    }
}

/// Write a token back in source form. Quote characters and backslashes
/// between a quoted token's delimiters are re-escaped so the output lexes
/// to the same text.
fn push_token(out: &mut String, token: &str) {
    let quote = token.chars().next().and_then(Quote::from_char);
    let inner = quote.and_then(|q| {
        let q = q.as_char();
        token
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
            .map(|inner| (q, inner))
    });

    let Some((q, inner)) = inner else {
        out.push_str(token);
        return;
    };

    out.push(q);
    for c in inner.chars() {
        if c == q || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(q);
}
