//! Error types for reading and writing program trees.

use thiserror::Error;

/// Errors raised while parsing or unparsing a program.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ScriptError {
    /// Input that does not form a token.
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Dedent to a column that matches no enclosing block.
    #[error("Inconsistent dedent at line {line}")]
    IndentationError { line: usize },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input: {0}")]
    UnexpectedEof(String),

    /// Expression on the left of `=` that cannot be assigned to.
    #[error("Cannot assign to {what} at line {line}")]
    InvalidTarget { line: usize, what: String },

    /// Malformed f-string literal.
    #[error("Invalid f-string: {0}")]
    FString(String),

    /// Compound statement with no body; it has no source form.
    #[error("Empty body in '{0}' block")]
    EmptyBlock(String),

    /// Interpolated expression that would need the literal's own quote.
    #[error("Expression '{expr}' cannot be placed inside a {quote}-quoted f-string")]
    FStringQuote { expr: String, quote: String },
}

/// Result type for program tree operations.
pub type ScriptResult<T> = Result<T, ScriptError>;
