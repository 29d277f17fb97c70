//! Error types for circuit obfuscation.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal conditions of the circuit path. Each one aborts the run before
/// anything is written.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ObfuscationError {
    /// Input file extension is neither `.qasm` nor `.py`.
    #[error("Unsupported file type '{0}'. Please use .qasm or .py")]
    UnsupportedFormat(String),

    /// Host script has no circuit builder function.
    #[error("Python file must contain a '{0}()' function")]
    MissingEntryPoint(String),

    /// Host script builder uses something the static evaluator cannot follow.
    #[error("Cannot evaluate '{statement}' in host script: {message}")]
    HostScript { statement: String, message: String },

    /// Circuit is wider than the configured ceiling.
    #[error("Circuit exceeds qubit limit ({num_qubits} > {max_qubits})")]
    ResourceLimitExceeded { num_qubits: usize, max_qubits: usize },

    /// Run deadline passed.
    #[error("The obfuscation process exceeded the time limit of {:.1}s", .limit.as_secs_f64())]
    Timeout { limit: Duration },

    /// No catalog sequence fits the available target qubits.
    #[error(
        "Noise synthesizer found no compatible sequence for {num_targets} qubit(s); check the inverse catalog"
    )]
    NoiseBankExhausted { num_targets: usize },

    /// Circuit invariant violated.
    #[error("Circuit error: {0}")]
    Circuit(#[from] qobf_ir::IrError),

    /// Malformed QASM input or unwritable circuit.
    #[error("QASM error: {0}")]
    Qasm(#[from] qobf_qasm::ParseError),

    /// Malformed host script.
    #[error("Script error: {0}")]
    Script(#[from] qobf_script::ScriptError),

    /// Reading or writing a circuit file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for circuit obfuscation.
pub type ObfuscationResult<T> = Result<T, ObfuscationError>;

/// A catalog gate token that cannot be turned into an instruction.
///
/// Token failures are never fatal: the algorithms log them and skip the
/// token.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Blank token or unbalanced parentheses.
    #[error("Malformed gate token '{0}'")]
    Malformed(String),

    /// Gate name not in the standard table.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// Parameter text failed to parse.
    #[error("Invalid parameter '{param}' in token '{token}': {message}")]
    InvalidParameter {
        token: String,
        param: String,
        message: String,
    },

    /// Parameter count differs from what the gate declares.
    #[error("Gate '{gate}' expects {expected} parameters, got {got}")]
    ParameterCount {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// Fewer target qubits than the gate's arity.
    #[error("Gate '{gate}' needs {expected} qubits, only {got} available")]
    NotEnoughQubits {
        gate: String,
        expected: usize,
        got: usize,
    },
}
