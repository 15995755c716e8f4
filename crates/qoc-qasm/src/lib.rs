//! Circuit and Gate-Duration Parsers for qoc
//!
//! This crate reads the two text inputs of the compiler: the circuit file,
//! a list of wire declarations followed by gates, and the gate-duration
//! table.
//!
//! # Circuit Format
//!
//! | Line | Example |
//! |------|---------|
//! | Wire declaration | `qubit a` |
//! | Gate | `CNOT a,b` |
//! | Rotation | `Rz 0.25 b` |
//! | Comment | `# comment` |
//!
//! Wires of one gate are separated by commas without spaces. Gates may
//! only use the op-codes of [`qoc_ir::StandardGate`].
//!
//! # Example: Parsing a Circuit
//!
//! ```rust
//! use qoc_qasm::{parse_circuit, parse_durations};
//!
//! let circuit = parse_circuit(
//!     "qubit a\nqubit b\nH a\nCNOT a,b\nRz 0.5 b\n",
//! ).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.num_gates(), 3);
//!
//! let durations = parse_durations("H 1\nCNOT 2\nRz 0.5\n").unwrap();
//! let dag = circuit.into_dag(durations).unwrap();
//! assert_eq!(dag.num_gates(), 3);
//! ```

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{ParsedCircuit, ParsedGate};
pub use error::{ParseError, ParseResult};
pub use parser::{parse_circuit, parse_durations};

// Re-export syntax types for advanced users
pub mod syntax {
    pub use crate::ast::*;
    pub use crate::lexer::{SpannedToken, Token, tokenize};
}
