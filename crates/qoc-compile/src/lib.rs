//! qoc Optimization Pipeline
//!
//! This crate turns a freshly built [`CircuitDag`](qoc_ir::CircuitDag) into a
//! scheduled, width-bounded circuit. It follows a pass-based architecture:
//! each pass consumes the DAG invariants and re-establishes them before the
//! next one runs.
//!
//! # Architecture
//!
//! ```text
//! CircuitDag (one gate per op)
//!       │
//!       ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (config, schedule, pass reports)
//! └─────────────┘
//!       │
//!       ├── CommutationAnalysis
//!       ├── SimpleCancellation   (pairs and rotation sums)
//!       ├── DiagonalMerge        (diagonal multi-wire groups)
//!       ├── ListScheduler        (per-timestep matching)
//!       ├── BlockMerge           (width-bounded packing)
//!       ├── ListScheduler        (final schedule)
//!       └── IntegrityVerification
//!       │
//!       ▼
//! Scheduled CircuitDag ──► write_schedule
//! ```
//!
//! # Example: Compiling a Small Circuit
//!
//! ```rust
//! use qoc_compile::{PassManagerBuilder, Schedule};
//! use qoc_ir::{CircuitDag, GateDurations, StandardGate};
//!
//! let mut dag = CircuitDag::new(GateDurations::uniform(1.0));
//! let a = dag.add_qubit("a").unwrap();
//! let b = dag.add_qubit("b").unwrap();
//! dag.push_op(StandardGate::X, &[a]).unwrap();
//! dag.push_op(StandardGate::X, &[a]).unwrap();
//! dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
//! dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
//!
//! let (pm, mut props) = PassManagerBuilder::new().with_block_width(2).build();
//! pm.run(&mut dag, &mut props).unwrap();
//!
//! // The X pair cancels and the CZ pair fuses into one gate.
//! assert_eq!(dag.num_gates(), 1);
//! let schedule: &Schedule = props.schedule.as_ref().unwrap();
//! assert_eq!(schedule.makespan, 2.0);
//! ```
//!
//! # Built-in Passes
//!
//! - [`passes::CommutationAnalysis`]: partition wire chains into commutation blocks
//! - [`passes::SimpleCancellation`]: cancel self-inverse pairs, sum rotations
//! - [`passes::DiagonalMerge`]: fuse groups of gates whose product is diagonal
//! - [`passes::ListScheduler`]: commutation-aware list scheduling
//! - [`passes::BlockMerge`]: pack adjacent gates into blocks of at most `W` wires
//! - [`passes::IntegrityVerification`]: structural checks on the result

pub mod config;
pub mod error;
pub mod manager;
pub mod output;
pub mod pass;
pub mod passes;
pub mod property;
pub mod verify;

pub use config::CompileConfig;
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use output::{render_schedule, write_schedule};
pub use pass::{Pass, PassKind};
pub use passes::{
    BlockMergeReport, CancellationReport, DiagonalMergeReport, Schedule, VerificationResult,
};
pub use property::PropertySet;
pub use verify::{UnitaryCheck, verify_unitary};

use qoc_ir::CircuitDag;

/// Validate `config`, run the standard pipeline on `dag` and return the
/// resulting properties.
pub fn compile(dag: &mut CircuitDag, config: CompileConfig) -> CompileResult<PropertySet> {
    config.validate()?;
    let (pm, mut properties) = PassManagerBuilder::new().with_config(config).build();
    pm.run(dag, &mut properties)?;
    Ok(properties)
}
