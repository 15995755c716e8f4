//! Verification pass for ensuring compilation correctness.
//!
//! Runs last in a pipeline and checks that the optimization passes left the
//! DAG structurally sound.

use tracing::debug;

use qoc_ir::CircuitDag;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Result of [`IntegrityVerification`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationResult {
    /// Whether the verification passed.
    pub passed: bool,
    /// Number of gates verified.
    pub gates_checked: usize,
    /// Number of wires verified.
    pub wires_checked: usize,
    /// Largest wire count of any gate.
    pub widest_gate: usize,
}

/// Analysis pass that checks the DAG after optimization.
///
/// - the structural invariants of [`CircuitDag::verify_integrity`] hold;
/// - along every wire chain, commutation block indices never decrease;
/// - with a block width configured, no fused gate is wider than it.
///   A gate holding a single operation is exempt, as it cannot be split.
pub struct IntegrityVerification;

impl IntegrityVerification {
    fn fail(&self, reason: impl Into<String>) -> CompileError {
        CompileError::PassFailed {
            name: self.name().to_string(),
            reason: reason.into(),
        }
    }

    fn check_block_order(&self, dag: &CircuitDag) -> CompileResult<()> {
        if !dag.is_analyzed() {
            return Ok(());
        }
        for wire in dag.qubit_ids() {
            let mut last = 0;
            for &g in dag.chain(wire) {
                let Some(block) = dag.block_of(g, wire) else {
                    return Err(self.fail(format!("gate {} has no block on {wire}", g.index())));
                };
                if block < last {
                    return Err(self.fail(format!(
                        "gate {} in block {block} follows block {last} on {wire}",
                        g.index()
                    )));
                }
                last = block;
            }
        }
        Ok(())
    }
}

impl Pass for IntegrityVerification {
    fn name(&self) -> &'static str {
        "integrity_verification"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        dag.verify_integrity()
            .map_err(|e| self.fail(e.to_string()))?;
        self.check_block_order(dag)?;

        let mut widest_gate = 0;
        for &g in dag.op_tab() {
            let Some(gate) = dag.gate(g) else {
                continue;
            };
            widest_gate = widest_gate.max(gate.num_qubits());
            if let Some(width) = properties.config.block_width {
                if !gate.is_single_op() && gate.num_qubits() > width {
                    return Err(self.fail(format!(
                        "gate {} ({}) spans {} wires, budget is {width}",
                        g.index(),
                        gate.label(),
                        gate.num_qubits()
                    )));
                }
            }
        }

        let result = VerificationResult {
            passed: true,
            gates_checked: dag.num_gates(),
            wires_checked: dag.num_qubits(),
            widest_gate,
        };
        debug!(
            "Integrity verification passed: {} gates, {} wires checked",
            result.gates_checked, result.wires_checked
        );
        properties.insert(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileConfig;
    use qoc_ir::{GateDurations, QubitId, StandardGate};

    fn run_verification(dag: &mut CircuitDag, props: &mut PropertySet) -> CompileResult<VerificationResult> {
        IntegrityVerification.run(dag, props)?;
        Ok(props.get::<VerificationResult>().unwrap().clone())
    }

    #[test]
    fn test_simple_circuit_passes() {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
        dag.push_op(StandardGate::Cnot, &[QubitId(0), QubitId(1)])
            .unwrap();
        dag.push_op(StandardGate::Measure, &[QubitId(1)]).unwrap();
        dag.detect_commutation();

        let result = run_verification(&mut dag, &mut PropertySet::new()).unwrap();
        assert!(result.passed);
        assert_eq!(result.gates_checked, 3);
        assert_eq!(result.wires_checked, 2);
        assert_eq!(result.widest_gate, 2);
    }

    #[test]
    fn test_empty_circuit() {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        let result = run_verification(&mut dag, &mut PropertySet::new()).unwrap();
        assert!(result.passed);
        assert_eq!(result.widest_gate, 0);
    }

    #[test]
    fn test_wide_fused_gate_fails() {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        let a = dag
            .push_op(StandardGate::Cz, &[QubitId(0), QubitId(1)])
            .unwrap();
        let b = dag
            .push_op(StandardGate::Cz, &[QubitId(0), QubitId(1)])
            .unwrap();
        dag.detect_commutation();
        dag.merge_gate(a, b).unwrap();

        let mut props = PropertySet::new().with_config(CompileConfig::default().with_block_width(1));
        assert!(matches!(
            run_verification(&mut dag, &mut props),
            Err(CompileError::PassFailed { .. })
        ));

        // Unfused two-wire gates are fine under the same budget.
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        dag.push_op(StandardGate::Cz, &[QubitId(0), QubitId(1)])
            .unwrap();
        assert!(run_verification(&mut dag, &mut props).is_ok());
    }
}
