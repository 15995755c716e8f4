//! Pass manager for orchestrating compilation.

use tracing::{debug, info, instrument};

use qoc_ir::CircuitDag;

use crate::config::CompileConfig;
use crate::error::CompileResult;
use crate::pass::Pass;
use crate::passes::{
    BlockMerge, CommutationAnalysis, DiagonalMerge, IntegrityVerification, ListScheduler,
    SimpleCancellation,
};
use crate::property::PropertySet;

/// Manages and executes a sequence of compilation passes.
pub struct PassManager {
    /// The passes to execute, in order.
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { passes: vec![] }
    }

    /// Add a pass to the manager.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Names of the passes, in execution order.
    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run all passes on the given DAG.
    #[instrument(skip(self, dag, properties))]
    pub fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            "Running pass manager with {} passes on circuit with {} qubits",
            self.passes.len(),
            dag.num_qubits()
        );

        for pass in &self.passes {
            if pass.should_run(dag, properties) {
                debug!("Running pass: {}", pass.name());
                pass.run(dag, properties)?;
                debug!(
                    "Pass {} completed, gates: {}, ops: {}",
                    pass.name(),
                    dag.num_gates(),
                    dag.num_ops()
                );
            } else {
                debug!("Skipping pass: {}", pass.name());
            }
        }

        info!(
            "Pass manager completed, gates: {}, ops: {}, makespan: {}",
            dag.num_gates(),
            dag.num_ops(),
            properties.schedule.as_ref().map_or(0.0, |s| s.makespan)
        );

        Ok(())
    }

    /// Get the number of passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for the standard optimization pipeline.
///
/// The pipeline is: commutation analysis, cancellation, diagonal merge,
/// re-analysis, scheduling, block merge, re-analysis, final scheduling and
/// an integrity check. Passes switched off in the configuration are still
/// added and skip themselves at run time.
pub struct PassManagerBuilder {
    properties: PropertySet,
    verify: bool,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            properties: PropertySet::new(),
            verify: true,
        }
    }

    /// Set the pipeline configuration.
    #[must_use]
    pub fn with_config(mut self, config: CompileConfig) -> Self {
        self.properties.config = config;
        self
    }

    /// Set the block-merge wire budget.
    #[must_use]
    pub fn with_block_width(mut self, width: usize) -> Self {
        self.properties.config.block_width = Some(width);
        self
    }

    /// Enable or disable the closing integrity check.
    #[must_use]
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();

        pm.add_pass(CommutationAnalysis);
        pm.add_pass(SimpleCancellation);
        pm.add_pass(DiagonalMerge);
        pm.add_pass(CommutationAnalysis);
        pm.add_pass(ListScheduler::new());
        pm.add_pass(BlockMerge);
        pm.add_pass(CommutationAnalysis);
        pm.add_pass(ListScheduler::rescheduling());

        if self.verify {
            pm.add_pass(IntegrityVerification);
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{BlockMergeReport, CancellationReport};
    use qoc_ir::{GateDurations, QubitId, StandardGate};

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);
    }

    #[test]
    fn test_pass_manager_run() {
        let pm = PassManager::new();
        let mut props = PropertySet::new();

        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
        dag.push_op(StandardGate::Cnot, &[QubitId(0), QubitId(1)])
            .unwrap();
        pm.run(&mut dag, &mut props).unwrap();

        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_pass_manager_builder() {
        let (pm, props) = PassManagerBuilder::new().with_block_width(3).build();

        assert_eq!(
            pm.pass_names(),
            vec![
                "commutation_analysis",
                "simple_cancellation",
                "diagonal_merge",
                "commutation_analysis",
                "list_scheduler",
                "block_merge",
                "commutation_analysis",
                "reschedule",
                "integrity_verification",
            ]
        );
        assert_eq!(props.config.block_width, Some(3));
    }

    #[test]
    fn test_full_pipeline() {
        let (pm, mut props) = PassManagerBuilder::new().with_block_width(2).build();

        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        let (q0, q1) = (QubitId(0), QubitId(1));
        dag.push_op(StandardGate::X, &[q0]).unwrap();
        dag.push_op(StandardGate::X, &[q0]).unwrap();
        dag.push_op(StandardGate::H, &[q1]).unwrap();
        dag.push_op(StandardGate::Cnot, &[q0, q1]).unwrap();
        dag.push_op(StandardGate::Rz(0.25), &[q1]).unwrap();
        pm.run(&mut dag, &mut props).unwrap();

        assert_eq!(props.get::<CancellationReport>().unwrap().removed, 2);
        assert!(props.get::<BlockMergeReport>().is_some());
        let schedule = props.require_schedule().unwrap();
        assert_eq!(schedule.len(), dag.num_gates());
        assert_eq!(dag.num_ops(), 3);
        assert!(dag.op_tab().iter().all(|&g| dag.gate(g).unwrap().num_qubits() <= 2));
    }
}
