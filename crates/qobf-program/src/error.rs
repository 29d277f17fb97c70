//! Error types for program obfuscation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while obfuscating a source program.
///
/// Unparseable input is not an error: renaming and splitting degrade to
/// returning the source as it came in.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgramError {
    /// Template id not in the built-in set.
    #[error("Unknown template '{name}'. Available: {available}")]
    UnknownTemplate { name: String, available: String },

    /// Template text names a placeholder with no value.
    #[error("Template missing key: '{0}'")]
    TemplateMissingKey(String),

    /// Unbalanced `{` or `}` in template text.
    #[error("Malformed template at byte {offset}: {message}")]
    MalformedTemplate { offset: usize, message: String },

    /// Trigger or noise circuit could not be built.
    #[error("Circuit error: {0}")]
    Circuit(#[from] qobf_ir::IrError),

    /// Reading the payload, a template or writing the result failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for program obfuscation.
pub type ProgramResult<T> = Result<T, ProgramError>;
