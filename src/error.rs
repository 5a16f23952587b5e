//! Error and diagnostic definitions for all `funar` stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum FunarError {
    /// Source text could not be tokenized or parsed.
    #[error("source error at {pos}: {message}")]
    SourceError { pos: usize, message: String },
    /// A required option was absent (or falsy) when building call arguments.
    #[error("missing required parameter: {option}")]
    MissingRequired { option: String },
    /// An option value could not be coerced to its declared type.
    #[error("type mismatch for parameter '{option}': expected {expected}, got '{value}'")]
    TypeMismatch {
        option: String,
        expected: String,
        value: String,
    },
    /// A placement path could not be applied to the call-argument array.
    #[error("path error: {0}")]
    PathError(String),
    /// Output serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error from CLI or callers that propagate I/O.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal condition recorded while extracting contracts.
///
/// Extraction never aborts on these; they are collected next to the
/// contracts so callers can report them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    /// A parameter used a pattern outside the supported grammar and was dropped.
    #[error("function '{function}': unsupported parameter pattern '{kind}' at position {position}")]
    UnsupportedPattern {
        function: String,
        kind: String,
        position: usize,
    },
    /// Declaration and documentation disagree on a default literal.
    #[error(
        "function '{function}': default value mismatch for '{name}' (declared {declared}, documented {documented})"
    )]
    DefaultMismatch {
        function: String,
        name: String,
        declared: String,
        documented: String,
    },
    /// A type alias refers back to itself; the reference was kept opaque.
    #[error("circular type alias: {0}")]
    CircularTypeAlias(String),
    /// A synthesized alias property clashed with an existing variable name.
    #[error("function '{function}': alias property '{name}' collides with an existing variable")]
    AliasCollision { function: String, name: String },
}
