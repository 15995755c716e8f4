//! Syntax of the circuit and duration formats.

use qoc_ir::StandardGate;

/// One non-empty line of a circuit file.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `qubit <name>`
    QubitDecl { name: String },
    /// `<op> [<angle>] <wire>,<wire>,...`
    Gate(GateLine),
}

/// A gate line as written, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct GateLine {
    pub name: String,
    pub rotation: Option<f64>,
    pub wires: Vec<String>,
}

/// A validated gate of a [`ParsedCircuit`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGate {
    /// Source line, 1-based.
    pub line: usize,
    pub gate: StandardGate,
    /// Wire names in operand order.
    pub wires: Vec<String>,
}

impl ParsedGate {
    /// The gate as written in the input, e.g. `CNOT a,b`.
    pub fn source_text(&self) -> String {
        let wires = self.wires.join(",");
        match self.gate.rotation() {
            Some(theta) => format!("{} {theta} {wires}", self.gate.name()),
            None => format!("{} {wires}", self.gate.name()),
        }
    }
}

/// A circuit file: declared wires in declaration order, then the gates in
/// program order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCircuit {
    pub qubits: Vec<String>,
    pub gates: Vec<ParsedGate>,
}

impl ParsedCircuit {
    /// Number of declared wires.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Number of gates.
    pub fn num_gates(&self) -> usize {
        self.gates.len()
    }
}
