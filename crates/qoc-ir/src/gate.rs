//! Quantum gate types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// The closed set of op-codes the compiler understands.
///
/// Rotation variants carry their angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Paulis and Hadamard
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Phase gates
    /// S gate (sqrt(Z)).
    S,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdag,

    // Rotations
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),

    // Two-qubit gates
    /// Controlled-X; the first wire is the control.
    Cnot,
    /// Controlled-Z gate.
    Cz,
    /// SWAP gate.
    Swap,

    /// Computational-basis measurement. Has no unitary.
    Measure,
}

/// Every op-code name, in table order.
pub const GATE_NAMES: [&str; 14] = [
    "H", "X", "Y", "Z", "S", "T", "Tdag", "Rx", "Ry", "Rz", "CNOT", "CZ", "swap", "measure",
];

impl StandardGate {
    /// Build a gate from its op-code name and optional rotation.
    ///
    /// `h` is accepted as an alias of `H`.
    pub fn from_name(name: &str, rotation: Option<f64>) -> IrResult<Self> {
        let gate = match (name, rotation) {
            ("Rx", Some(theta)) => return Ok(StandardGate::Rx(theta)),
            ("Ry", Some(theta)) => return Ok(StandardGate::Ry(theta)),
            ("Rz", Some(theta)) => return Ok(StandardGate::Rz(theta)),
            ("Rx" | "Ry" | "Rz", None) => return Err(IrError::MissingRotation(name.to_string())),
            ("H" | "h", _) => StandardGate::H,
            ("X", _) => StandardGate::X,
            ("Y", _) => StandardGate::Y,
            ("Z", _) => StandardGate::Z,
            ("S", _) => StandardGate::S,
            ("T", _) => StandardGate::T,
            ("Tdag", _) => StandardGate::Tdag,
            ("CNOT", _) => StandardGate::Cnot,
            ("CZ", _) => StandardGate::Cz,
            ("swap", _) => StandardGate::Swap,
            ("measure", _) => StandardGate::Measure,
            _ => return Err(IrError::UnknownGate(name.to_string())),
        };
        if rotation.is_some() {
            return Err(IrError::UnexpectedRotation(name.to_string()));
        }
        Ok(gate)
    }

    /// Op-code name, as used in input files, output and the duration table.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::H => "H",
            StandardGate::X => "X",
            StandardGate::Y => "Y",
            StandardGate::Z => "Z",
            StandardGate::S => "S",
            StandardGate::T => "T",
            StandardGate::Tdag => "Tdag",
            StandardGate::Rx(_) => "Rx",
            StandardGate::Ry(_) => "Ry",
            StandardGate::Rz(_) => "Rz",
            StandardGate::Cnot => "CNOT",
            StandardGate::Cz => "CZ",
            StandardGate::Swap => "swap",
            StandardGate::Measure => "measure",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::Cnot | StandardGate::Cz | StandardGate::Swap => 2,
            _ => 1,
        }
    }

    /// Rotation angle, for `Rx`/`Ry`/`Rz`.
    #[inline]
    pub fn rotation(&self) -> Option<f64> {
        match self {
            StandardGate::Rx(theta) | StandardGate::Ry(theta) | StandardGate::Rz(theta) => {
                Some(*theta)
            }
            _ => None,
        }
    }

    /// Same axis, new angle. Returns `None` for non-rotations.
    pub fn with_rotation(&self, theta: f64) -> Option<Self> {
        match self {
            StandardGate::Rx(_) => Some(StandardGate::Rx(theta)),
            StandardGate::Ry(_) => Some(StandardGate::Ry(theta)),
            StandardGate::Rz(_) => Some(StandardGate::Rz(theta)),
            _ => None,
        }
    }

    /// Check whether this is an axis rotation.
    #[inline]
    pub fn is_rotation(&self) -> bool {
        self.rotation().is_some()
    }

    /// Single-qubit gates that are their own inverse and cancel pairwise.
    #[inline]
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            StandardGate::X | StandardGate::Y | StandardGate::Z | StandardGate::H
        )
    }

    /// Gates kept out of diagonal fusion groups.
    #[inline]
    pub fn blocks_diagonal_merge(&self) -> bool {
        matches!(
            self,
            StandardGate::H | StandardGate::S | StandardGate::T | StandardGate::Tdag
        )
    }

    /// Whether the gate has a unitary matrix.
    #[inline]
    pub fn is_unitary(&self) -> bool {
        !matches!(self, StandardGate::Measure)
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rotation() {
            Some(theta) => write!(f, "{}({theta})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// An elementary operation: op-code, ordered wires and a fixed duration.
///
/// Immutable once built. Only lives inside an aggregated gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicOp {
    gate: StandardGate,
    qubits: Vec<QubitId>,
    duration: f64,
}

impl AtomicOp {
    /// Create an operation, checking arity and wire distinctness.
    pub fn new(gate: StandardGate, qubits: Vec<QubitId>, duration: f64) -> IrResult<Self> {
        let expected = gate.num_qubits();
        let got = u32::try_from(qubits.len()).unwrap_or(u32::MAX);
        if expected != got {
            return Err(IrError::QubitCountMismatch {
                gate_name: gate.name().to_string(),
                expected,
                got,
            });
        }
        for (i, q) in qubits.iter().enumerate() {
            if qubits[..i].contains(q) {
                return Err(IrError::DuplicateQubit {
                    qubit: *q,
                    gate_name: Some(gate.name().to_string()),
                });
            }
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(IrError::InvalidDuration {
                gate_name: gate.name().to_string(),
                value: duration,
            });
        }
        Ok(Self {
            gate,
            qubits,
            duration,
        })
    }

    /// The op-code.
    #[inline]
    pub fn gate(&self) -> &StandardGate {
        &self.gate
    }

    /// Op-code name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.gate.name()
    }

    /// Wires in operand order.
    #[inline]
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Fixed duration from the gate-duration table.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Rotation angle if this is a rotation.
    #[inline]
    pub fn rotation(&self) -> Option<f64> {
        self.gate.rotation()
    }
}
