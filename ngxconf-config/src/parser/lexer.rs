//! Lexer for nginx-style configuration files
//!
//! Tokenizing happens in two layers:
//! - `logos` splits the source into raw lexemes (runs of text, whitespace,
//!   single punctuation characters)
//! - a small state machine decides what each lexeme means in the current
//!   context (comment, bare word, quoted string, escape)
//!
//! Quoted strings keep their delimiting quote characters in the token text.
//! Inside a quoted string a backslash is dropped and the next character is
//! taken literally.

use logos::{Logos, Span};
use serde::Serialize;
use std::fmt;

/// Source location for error reporting (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// A token with its location in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Location,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: impl Into<Location>) -> Self {
        Self {
            value,
            span: span.into(),
        }
    }
}

/// Quote character delimiting a quoted string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quote {
    Double,
    Single,
}

impl Quote {
    pub fn as_char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '"' => Some(Quote::Double),
            '\'' => Some(Quote::Single),
            _ => None,
        }
    }
}

/// Lexical tokens of the configuration language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unquoted word: directive names, numbers, paths, ...
    BareWord(String),

    /// Quoted string. `text` includes the surrounding quotes.
    QuotedString { quote: Quote, text: String },

    OpenBrace,
    CloseBrace,
    Semicolon,
}

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("Unterminated quoted string starting at position {at}")]
    UnterminatedQuote { at: Location },

    #[error("Quote character inside bare word at position {at}")]
    QuoteInBareWord { at: Location },

    #[error("Quoted token must be followed by whitespace or a terminator at position {at}")]
    QuotedTokenNotSeparated { at: Location },

    #[error("Invalid character at position {at}")]
    InvalidCharacter { at: Location },
}

impl LexError {
    pub fn location(&self) -> Location {
        match self {
            LexError::UnterminatedQuote { at }
            | LexError::QuoteInBareWord { at }
            | LexError::QuotedTokenNotSeparated { at }
            | LexError::InvalidCharacter { at } => *at,
        }
    }
}

/// Raw lexemes. Every character of the input falls into exactly one class.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    #[token("\n")]
    Newline,

    #[regex(r"[ \t\r\x0c]+")]
    Space,

    #[token("#")]
    Hash,

    #[token("{")]
    OpenBrace,

    #[token("}")]
    CloseBrace,

    #[token(";")]
    Semicolon,

    #[token("\"")]
    DoubleQuote,

    #[token("'")]
    SingleQuote,

    #[token("\\")]
    Backslash,

    /// ASCII control characters other than whitespace
    #[regex(r"[\x00-\x08\x0b\x0e-\x1f\x7f]")]
    Control,

    #[regex(r#"[^ \t\r\n\x0c#{};"'\\\x00-\x08\x0b\x0e-\x1f\x7f]+"#)]
    Text,
}

impl Lexeme {
    fn quote(self) -> Option<Quote> {
        match self {
            Lexeme::DoubleQuote => Some(Quote::Double),
            Lexeme::SingleQuote => Some(Quote::Single),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Default,
    InComment,
    InBareWord,
    InQuotedString(Quote),
    InQuotedEscape(Quote),
}

/// Lazy token stream over a source string.
///
/// Yields at most one error; after that the stream is exhausted.
pub struct Tokenizer<'src> {
    lexer: logos::Lexer<'src, Lexeme>,
    state: LexState,
    buffer: String,
    token_start: usize,
    pending: Option<Spanned<Token>>,
    finished: bool,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexeme::lexer(source),
            state: LexState::Default,
            buffer: String::new(),
            token_start: 0,
            pending: None,
            finished: false,
        }
    }

    /// Feed one lexeme through the state machine
    fn step(&mut self, lexeme: Lexeme, span: Span) -> Result<Option<Spanned<Token>>, LexError> {
        let slice = self.lexer.slice();

        match (self.state, lexeme) {
            (LexState::Default, Lexeme::Newline | Lexeme::Space) => Ok(None),
            (LexState::Default, Lexeme::Hash) => {
                self.state = LexState::InComment;
                Ok(None)
            }
            (LexState::Default, Lexeme::OpenBrace) => Ok(Some(Spanned::new(Token::OpenBrace, span))),
            (LexState::Default, Lexeme::CloseBrace) => Ok(Some(Spanned::new(Token::CloseBrace, span))),
            (LexState::Default, Lexeme::Semicolon) => Ok(Some(Spanned::new(Token::Semicolon, span))),
            (LexState::Default, Lexeme::DoubleQuote) => {
                self.open_quote(Quote::Double, span.start);
                Ok(None)
            }
            (LexState::Default, Lexeme::SingleQuote) => {
                self.open_quote(Quote::Single, span.start);
                Ok(None)
            }
            (LexState::Default | LexState::InBareWord, Lexeme::Control) => {
                Err(LexError::InvalidCharacter { at: span.into() })
            }
            (LexState::Default, Lexeme::Text | Lexeme::Backslash) => {
                self.token_start = span.start;
                self.buffer.push_str(slice);
                self.state = LexState::InBareWord;
                Ok(None)
            }

            (LexState::InComment, Lexeme::Newline) => {
                self.state = LexState::Default;
                Ok(None)
            }
            (LexState::InComment, _) => Ok(None),

            (LexState::InBareWord, Lexeme::Text | Lexeme::Backslash) => {
                self.buffer.push_str(slice);
                Ok(None)
            }
            (LexState::InBareWord, Lexeme::DoubleQuote | Lexeme::SingleQuote) => {
                Err(LexError::QuoteInBareWord { at: span.into() })
            }
            (
                LexState::InBareWord,
                Lexeme::Newline
                | Lexeme::Space
                | Lexeme::Hash
                | Lexeme::OpenBrace
                | Lexeme::CloseBrace
                | Lexeme::Semicolon,
            ) => {
                // The terminator is re-dispatched from the default state
                let word = self.take_word(span.start);
                self.state = LexState::Default;
                self.pending = self.step(lexeme, span)?;
                Ok(Some(word))
            }

            (LexState::InQuotedString(quote), Lexeme::Backslash) => {
                self.state = LexState::InQuotedEscape(quote);
                Ok(None)
            }
            (LexState::InQuotedString(quote), _) if lexeme.quote() == Some(quote) => {
                self.buffer.push(quote.as_char());
                self.state = LexState::Default;
                self.ensure_separated(span.end)?;
                Ok(Some(self.take_quoted(quote, span.end)))
            }
            (LexState::InQuotedString(_), _) => {
                self.buffer.push_str(slice);
                Ok(None)
            }
            (LexState::InQuotedEscape(quote), _) => {
                self.buffer.push_str(slice);
                self.state = LexState::InQuotedString(quote);
                Ok(None)
            }
        }
    }

    fn open_quote(&mut self, quote: Quote, start: usize) {
        self.token_start = start;
        self.buffer.push(quote.as_char());
        self.state = LexState::InQuotedString(quote);
    }

    /// A closing quote must be followed by whitespace, a brace, `;`, `#` or
    /// end of input.
    fn ensure_separated(&self, at: usize) -> Result<(), LexError> {
        match self.lexer.remainder().chars().next() {
            None | Some(' ' | '\t' | '\r' | '\n' | '\x0c' | '{' | '}' | ';' | '#') => Ok(()),
            Some(c) => Err(LexError::QuotedTokenNotSeparated {
                at: Location {
                    start: at,
                    end: at + c.len_utf8(),
                },
            }),
        }
    }

    fn take_word(&mut self, end: usize) -> Spanned<Token> {
        let text = std::mem::take(&mut self.buffer);
        Spanned::new(
            Token::BareWord(text),
            Location {
                start: self.token_start,
                end,
            },
        )
    }

    fn take_quoted(&mut self, quote: Quote, end: usize) -> Spanned<Token> {
        let text = std::mem::take(&mut self.buffer);
        Spanned::new(
            Token::QuotedString { quote, text },
            Location {
                start: self.token_start,
                end,
            },
        )
    }

    /// Flush whatever is buffered when the input runs out
    fn finish(&mut self) -> Result<Option<Spanned<Token>>, LexError> {
        let end = self.lexer.source().len();

        match std::mem::replace(&mut self.state, LexState::Default) {
            LexState::Default | LexState::InComment => Ok(None),
            LexState::InBareWord => Ok(Some(self.take_word(end))),
            LexState::InQuotedString(_) | LexState::InQuotedEscape(_) => {
                Err(LexError::UnterminatedQuote {
                    at: Location {
                        start: self.token_start,
                        end,
                    },
                })
            }
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Spanned<Token>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(Ok(token));
        }
        if self.finished {
            return None;
        }

        loop {
            let result = match self.lexer.next() {
                Some(Ok(lexeme)) => {
                    let span = self.lexer.span();
                    self.step(lexeme, span)
                }
                Some(Err(())) => Err(LexError::InvalidCharacter {
                    at: self.lexer.span().into(),
                }),
                None => {
                    self.finished = true;
                    return self.finish().transpose();
                }
            };

            match result {
                Ok(Some(token)) => return Some(Ok(token)),
                Ok(None) => continue,
                Err(e) => {
                    self.finished = true;
                    self.pending = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Lexer result type
pub type LexResult = Result<Vec<Spanned<Token>>, LexError>;

/// Tokenize a whole source string
pub fn tokenize(source: &str) -> LexResult {
    Tokenizer::new(source).collect()
}
