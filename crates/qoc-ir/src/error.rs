//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit referenced by a gate but never declared.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_index, .gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Position of the gate in the input sequence, if known.
        gate_index: Option<usize>,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A qubit name was declared twice.
    #[error("Qubit '{0}' declared more than once")]
    DuplicateDeclaration(String),

    /// No duration is configured for an op-code.
    #[error("No duration configured for gate '{0}'")]
    MissingDuration(String),

    /// Negative or non-finite duration.
    #[error("Invalid duration {value} for gate '{gate_name}'")]
    InvalidDuration {
        /// Name of the gate.
        gate_name: String,
        /// The rejected value.
        value: f64,
    },

    /// Op-code is not part of the gate set.
    #[error("Unknown gate '{0}'")]
    UnknownGate(String),

    /// Rotation gate given without an angle.
    #[error("Gate '{0}' requires a rotation angle")]
    MissingRotation(String),

    /// Fixed gate given an angle.
    #[error("Gate '{0}' does not take a rotation angle")]
    UnexpectedRotation(String),

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(&None, .gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// An aggregated gate must hold at least one atomic operation.
    #[error("Aggregated gate must contain at least one operation")]
    EmptyGate,

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Gate handle does not refer to a live node.
    #[error("Invalid gate handle")]
    InvalidNode,

    /// Operation needs commutation blocks, but analysis has not run since the last edit.
    #[error("Commutation analysis has not been run on this DAG")]
    NotAnalyzed,
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_index: &Option<usize>, gate_name: &Option<String>) -> String {
    match (gate_index, gate_name) {
        (Some(idx), Some(name)) => format!(" (gate #{idx}: {name})"),
        (None, Some(name)) => format!(" (gate: {name})"),
        (Some(idx), None) => format!(" (gate #{idx})"),
        (None, None) => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
