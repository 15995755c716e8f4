//! Cancellation of self-inverse pairs and fusion of same-axis rotations.

use tracing::{debug, trace};

use qoc_ir::{AggregatedGate, CircuitDag, GateId, QubitId, StandardGate};

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Outcome of a [`SimpleCancellation`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationReport {
    /// Analysis-then-cancel sweeps, including the final one that changed nothing.
    pub iterations: usize,
    /// Gates removed by pair cancellation.
    pub removed: usize,
    /// Rotation groups fused into one gate.
    pub fused: usize,
}

/// Groups gates that may cancel against each other.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CancelKey {
    /// Single-wire gates of one op-code inside one block.
    Single {
        block: usize,
        gate: &'static str,
        wire: QubitId,
    },
    /// CNOTs with the same control block and the same target block.
    Cnot {
        ctrl_block: usize,
        ctrl: QubitId,
        tgt_block: usize,
        tgt: QubitId,
    },
}

/// Repeated commutation analysis and cancellation until the gate count
/// stops shrinking.
///
/// Inside one commutation block, gates are bucketed by op-code:
///
/// - X, Y, Z and H cancel pairwise; the first `2 * floor(n / 2)` of a
///   bucket are removed and their dependencies bridged.
/// - Rx, Ry and Rz buckets collapse into a single rotation whose angle is
///   the sum of the angles. It takes the first gate's position.
/// - CNOTs cancel pairwise when they share a block on both their control
///   and their target wire.
///
/// Only gates wrapping a single operation are candidates.
pub struct SimpleCancellation;

impl SimpleCancellation {
    fn collect_keys(dag: &CircuitDag) -> Vec<(CancelKey, Vec<GateId>)> {
        let mut groups: Vec<(CancelKey, Vec<GateId>)> = Vec::new();
        let mut push = |key: CancelKey, id: GateId| match groups.iter_mut().find(|(k, _)| *k == key)
        {
            Some((_, members)) => members.push(id),
            None => groups.push((key, vec![id])),
        };

        for wire in dag.qubit_ids() {
            for (block, members) in dag.blocks(wire).iter().enumerate() {
                for &id in members {
                    let Some(gate) = dag.gate(id) else {
                        continue;
                    };
                    if !gate.is_single_op() {
                        continue;
                    }
                    let op = gate.first_op();
                    if gate.num_qubits() == 1 {
                        push(
                            CancelKey::Single {
                                block,
                                gate: op.name(),
                                wire,
                            },
                            id,
                        );
                    } else if *op.gate() == StandardGate::Cnot && op.qubits()[0] == wire {
                        let tgt = op.qubits()[1];
                        let Some(tgt_block) = dag.block_of(id, tgt) else {
                            continue;
                        };
                        push(
                            CancelKey::Cnot {
                                ctrl_block: block,
                                ctrl: wire,
                                tgt_block,
                                tgt,
                            },
                            id,
                        );
                    }
                }
            }
        }
        groups
    }

    /// One cancellation sweep over an analyzed DAG.
    fn sweep(dag: &mut CircuitDag, report: &mut CancellationReport) -> CompileResult<()> {
        for (key, members) in Self::collect_keys(dag) {
            if members.len() < 2 {
                continue;
            }
            let Some(first) = dag.gate(members[0]) else {
                continue;
            };
            let gate = *first.first_op().gate();

            if gate.is_rotation() {
                let angle: f64 = members
                    .iter()
                    .filter_map(|&id| dag.gate(id).and_then(|g| g.first_op().rotation()))
                    .sum();
                let Some(fused) = gate.with_rotation(angle) else {
                    continue;
                };
                let wires = first.qubits().to_vec();
                let op = dag.atomic_op(fused, wires)?;
                let id = dag.substitute(&members, AggregatedGate::single(op))?;
                trace!(gate = id.index(), angle, count = members.len(), "fused rotations");
                report.fused += 1;
            } else if gate.is_self_inverse() || matches!(key, CancelKey::Cnot { .. }) {
                let pairs = members.len() / 2 * 2;
                for &id in &members[..pairs] {
                    dag.remove_gate(id)?;
                }
                trace!(gate = gate.name(), removed = pairs, "cancelled pairs");
                report.removed += pairs;
            }
        }
        Ok(())
    }
}

impl Pass for SimpleCancellation {
    fn name(&self) -> &'static str {
        "simple_cancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let mut report = CancellationReport::default();
        let mut previous = usize::MAX;
        while dag.num_gates() != previous {
            previous = dag.num_gates();
            dag.detect_commutation();
            Self::sweep(dag, &mut report)?;
            report.iterations += 1;
        }
        // The last sweep changed nothing, so its blocks are still current.
        properties.schedule = None;

        debug!(
            iterations = report.iterations,
            removed = report.removed,
            fused = report.fused,
            "cancellation converged"
        );
        properties.insert(report);
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.config.cancellation && !dag.is_empty()
    }
}
