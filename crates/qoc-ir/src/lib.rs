//! qoc Circuit Intermediate Representation
//!
//! This crate provides the data structures the qoc compiler optimizes: a DAG
//! of aggregated gates whose per-wire chains are partitioned into
//! commutation blocks.
//!
//! # Overview
//!
//! Every DAG node is an [`AggregatedGate`]: one or more [`AtomicOp`]s fused
//! into a unit that is scheduled as a whole. Nodes live in a stable arena and
//! are addressed by [`GateId`] handles. Edges carry the wire they run along.
//!
//! # Core Components
//!
//! - **Wires**: [`QubitId`] and [`Qubit`] for declared wires
//! - **Gates**: [`StandardGate`] for the op-code set and [`AtomicOp`] for a
//!   gate placed on wires with a duration from [`GateDurations`]
//! - **Aggregated gates**: [`AggregatedGate`] with its private
//!   [`SubCircuit`]
//! - **DAG**: [`CircuitDag`] with commutation analysis
//!   ([`CircuitDag::detect_commutation`]) and the merge primitive
//!   ([`CircuitDag::merge_gate`])
//! - **Unitaries**: the [`unitary`] module for commutation and diagonality
//!   checks on small gate groups
//!
//! # Example: Fusing two CZ gates
//!
//! ```rust
//! use qoc_ir::{CircuitDag, GateDurations, MergeOutcome, StandardGate};
//!
//! let mut dag = CircuitDag::new(GateDurations::uniform(1.0));
//! let a = dag.add_qubit("a").unwrap();
//! let b = dag.add_qubit("b").unwrap();
//!
//! let first = dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
//! let second = dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
//!
//! // Two CZs commute, so they share a block on both wires.
//! dag.detect_commutation();
//! assert_eq!(dag.block_of(first, a), dag.block_of(second, a));
//!
//! let outcome = dag.merge_gate(first, second).unwrap();
//! assert!(matches!(outcome, MergeOutcome::Merged(_)));
//! assert_eq!(dag.num_gates(), 1);
//! assert_eq!(dag.num_ops(), 2);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H` | 1 | Hadamard gate (`h` accepted on input) |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `S` | 1 | S gate |
//! | `T`, `Tdag` | 1 | T and T-dagger gates |
//! | `Rx`, `Ry`, `Rz` | 1 | Rotation gates |
//! | `CNOT` | 2 | Controlled-NOT |
//! | `CZ` | 2 | Controlled-Z |
//! | `swap` | 2 | SWAP gate |
//! | `measure` | 1 | Measurement, no unitary |

pub mod aggregate;
pub mod commutation;
pub mod dag;
pub mod duration;
pub mod error;
pub mod gate;
pub mod merge;
pub mod qubit;
pub mod unitary;

pub use aggregate::{AggregatedGate, SubCircuit};
pub use dag::{CircuitDag, DagEdge, GateId};
pub use duration::GateDurations;
pub use error::{IrError, IrResult};
pub use gate::{AtomicOp, GATE_NAMES, StandardGate};
pub use merge::MergeOutcome;
pub use qubit::{Qubit, QubitId};
pub use unitary::Matrix;
