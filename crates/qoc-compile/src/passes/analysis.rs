//! Commutation analysis pass.

use tracing::debug;

use qoc_ir::CircuitDag;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Partitions every wire chain into commutation blocks.
///
/// Rebuilds the dependency edges and the pred/suc/commuting-peer sets from
/// the blocks. Start times stamped by an earlier scheduler run are kept.
pub struct CommutationAnalysis;

impl Pass for CommutationAnalysis {
    fn name(&self) -> &'static str {
        "commutation_analysis"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, _properties: &mut PropertySet) -> CompileResult<()> {
        dag.detect_commutation();
        debug!(gates = dag.num_gates(), "commutation blocks rebuilt");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qoc_ir::{GateDurations, QubitId, StandardGate};

    #[test]
    fn test_analysis_marks_dag() {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        dag.push_op(StandardGate::Cnot, &[QubitId(0), QubitId(1)])
            .unwrap();
        dag.push_op(StandardGate::Z, &[QubitId(0)]).unwrap();
        assert!(!dag.is_analyzed());

        CommutationAnalysis
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        assert!(dag.is_analyzed());
        assert_eq!(dag.blocks(QubitId(0)).len(), 1);
    }
}
