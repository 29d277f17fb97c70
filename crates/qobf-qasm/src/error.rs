//! Error types for the QASM reader and writer.

use thiserror::Error;

/// Errors that can occur while reading or writing QASM.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Lexer error at line {line}: {message}")]
    LexerError { line: usize, message: String },

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

    /// Invalid version.
    #[error("Invalid OPENQASM version: {0}")]
    InvalidVersion(String),

    /// Undefined identifier.
    #[error("Undefined identifier: {0}")]
    UndefinedIdentifier(String),

    /// Register declared twice.
    #[error("Duplicate declaration: {0}")]
    DuplicateDeclaration(String),

    /// Gate name not in the standard table.
    #[error("Unknown gate: {0}")]
    UnknownGate(String),

    /// Wrong number of qubit operands.
    #[error("Gate '{gate}' expects {expected} qubits, got {got}")]
    WrongQubitCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Wrong number of parameters.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Register operands of different sizes in one broadcast statement.
    #[error("Cannot broadcast '{gate}' over registers of sizes {sizes:?}")]
    BroadcastMismatch { gate: String, sizes: Vec<usize> },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for register '{register}' of size {size}")]
    IndexOutOfBounds {
        register: String,
        index: usize,
        size: usize,
    },

    /// Expression that does not evaluate to a gate angle.
    #[error("Invalid parameter expression: {0}")]
    InvalidParameter(String),

    /// Statement outside the flat gate-list subset.
    #[error("Unsupported statement: {0}")]
    Unsupported(String),

    /// Circuit invariant violated while building the circuit.
    #[error("Circuit error: {0}")]
    CircuitError(#[from] qobf_ir::IrError),
}

/// Result type for QASM operations.
pub type ParseResult<T> = Result<T, ParseError>;
