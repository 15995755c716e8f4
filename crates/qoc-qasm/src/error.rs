//! Error types for the circuit and duration parsers.

use thiserror::Error;

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Lexer error (invalid token).
    #[error("Line {line}: {message}")]
    LexerError { line: usize, message: String },

    /// Unexpected token.
    #[error("Unexpected token at line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Op-code outside the gate set.
    #[error("Line {line}: unknown gate op {name}")]
    UnknownGate { line: usize, name: String },

    /// Wrong number of wires.
    #[error("Line {line}: gate '{gate}' expects {expected} qubits, got {got}")]
    WrongQubitCount {
        line: usize,
        gate: String,
        expected: usize,
        got: usize,
    },

    /// The same wire listed twice on one gate.
    #[error("Line {line}: duplicate qubit '{qubit}' in {gate}")]
    DuplicateQubit {
        line: usize,
        gate: String,
        qubit: String,
    },

    /// Rotation gate without an angle.
    #[error("Line {line}: gate '{gate}' requires a rotation angle")]
    MissingRotation { line: usize, gate: String },

    /// Angle given to a gate that takes none.
    #[error("Line {line}: gate '{gate}' takes no rotation angle")]
    UnexpectedRotation { line: usize, gate: String },

    /// Wire declared twice.
    #[error("Line {line}: qubit '{name}' declared twice")]
    DuplicateDeclaration { line: usize, name: String },

    /// Gate on a wire that was never declared.
    #[error("No qubit {name} for gate # {gate_index}: {gate}")]
    UndeclaredQubit {
        name: String,
        gate_index: usize,
        gate: String,
    },

    /// IR error during circuit construction.
    #[error("Circuit error: {0}")]
    CircuitError(#[from] qoc_ir::IrError),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;
