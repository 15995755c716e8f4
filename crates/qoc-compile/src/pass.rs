//! Pass trait and types for compilation passes.

use qoc_ir::CircuitDag;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Reads the DAG and writes to the `PropertySet`. May rebuild derived
    /// bookkeeping (blocks, edges, start times) but never adds or removes
    /// gates.
    Analysis,
    /// Adds, removes or fuses gates.
    Transformation,
}

/// A compilation pass that operates on a circuit DAG.
///
/// Each pass performs one transformation or analysis and leaves the DAG
/// invariants intact for the next one.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Run the pass on the given DAG.
    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run based on current state.
    ///
    /// This can be overridden to skip passes that are not needed.
    fn should_run(&self, _dag: &CircuitDag, _properties: &PropertySet) -> bool {
        true
    }
}
