//! Error types for the compilation crate.

use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Error from the IR crate.
    #[error("IR error: {0}")]
    Ir(#[from] qoc_ir::IrError),

    /// The scheduler found no ready gate while blocks were still pending.
    #[error("Scheduler stalled with {pending} gates left on {wires} wires")]
    ScheduleStalled { pending: usize, wires: usize },

    /// A pass needs a schedule that has not been computed.
    #[error("No schedule available; run the scheduler first")]
    Unscheduled,

    /// Pass execution failed.
    #[error("Pass '{name}' failed: {reason}")]
    PassFailed { name: String, reason: String },

    /// A unitary comparison cannot be carried out.
    #[error("Cannot verify circuit: {0}")]
    Unverifiable(String),

    /// Invalid pass configuration.
    #[error("Invalid pass configuration: {0}")]
    InvalidConfiguration(String),

    /// Reading a configuration file or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
