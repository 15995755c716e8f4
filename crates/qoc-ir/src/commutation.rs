//! Commutation analysis over the circuit DAG.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::dag::{CircuitDag, DagEdge, GateId};
use crate::qubit::QubitId;
use crate::unitary::ops_commute;

impl CircuitDag {
    /// Check whether two live gates commute. Unknown handles never do.
    pub fn gates_commute(&self, a: GateId, b: GateId) -> bool {
        match (self.gate(a), self.gate(b)) {
            (Some(a), Some(b)) => ops_commute(a.ops(), b.ops()),
            _ => false,
        }
    }

    /// Partition every wire chain into commutation blocks and rebuild the
    /// dependency edges from them.
    ///
    /// Walking a chain in order, a gate joins the open block if it commutes
    /// with every member of that block (the last member is checked first)
    /// and opens a new block otherwise. Members of a block therefore commute
    /// pairwise. The
    /// edges on each wire are then exactly those from every member of one
    /// block to every member of the next. Flattened predecessor, successor
    /// and commuting-peer sets are recomputed for every gate.
    pub fn detect_commutation(&mut self) {
        let mut cache: FxHashMap<(GateId, GateId), bool> = FxHashMap::default();
        let mut blocks: FxHashMap<QubitId, Vec<Vec<GateId>>> = FxHashMap::default();
        let mut block_index: FxHashMap<(GateId, QubitId), usize> = FxHashMap::default();

        let wires: Vec<QubitId> = self.qubit_ids().collect();
        for &w in &wires {
            let mut wire_blocks: Vec<Vec<GateId>> = Vec::new();
            for &g in self.chain(w) {
                let joins = wire_blocks.last().is_some_and(|block| {
                    block.iter().rev().all(|&m| {
                        *cache
                            .entry((m, g))
                            .or_insert_with(|| self.gates_commute(m, g))
                    })
                });
                if joins {
                    if let Some(block) = wire_blocks.last_mut() {
                        block.push(g);
                    }
                } else {
                    wire_blocks.push(vec![g]);
                }
                block_index.insert((g, w), wire_blocks.len() - 1);
            }
            blocks.insert(w, wire_blocks);
        }

        let graph = self.graph_mut();
        graph.clear_edges();
        for (&wire, wire_blocks) in &blocks {
            for pair in wire_blocks.windows(2) {
                for &a in &pair[0] {
                    for &b in &pair[1] {
                        graph.add_edge(a, b, DagEdge { wire });
                    }
                }
            }
        }

        let num_blocks: usize = blocks.values().map(Vec::len).sum();
        self.blocks = blocks;
        self.block_index = block_index;
        self.analyzed = true;

        let gates = self.op_tab().to_vec();
        for &g in &gates {
            self.refresh_adjacency(g);
        }
        self.com_set.clear();
        for &g in &gates {
            self.refresh_com_set(g);
        }
        debug!(
            gates = gates.len(),
            blocks = num_blocks,
            "commutation analysis complete"
        );
    }

    /// Gates that commute with `id`, derived from the commutation blocks.
    ///
    /// A single-wire gate commutes with the rest of its block. A multi-wire
    /// gate commutes with every single-wire gate in any of its blocks, and
    /// with a multi-wire gate only if they share the same block index on
    /// every wire they have in common. Never contains `id`; encounter order.
    pub fn gate_commutation_set(&self, id: GateId) -> Vec<GateId> {
        let Some(gate) = self.gate(id) else {
            return Vec::new();
        };
        let wires = gate.qubits();
        let mut peers = Vec::new();

        for &w in wires {
            let Some(b) = self.block_of(id, w) else {
                continue;
            };
            for &other in &self.blocks(w)[b] {
                if other == id || peers.contains(&other) {
                    continue;
                }
                let Some(other_gate) = self.gate(other) else {
                    continue;
                };
                let aligned = wires.len() == 1
                    || other_gate.num_qubits() == 1
                    || wires
                        .iter()
                        .filter(|&&s| other_gate.acts_on(s))
                        .all(|&s| self.block_of(id, s) == self.block_of(other, s));
                if aligned {
                    peers.push(other);
                }
            }
        }
        peers
    }
}

#[cfg(test)]
mod tests {
    use crate::dag::CircuitDag;
    use crate::duration::GateDurations;
    use crate::gate::StandardGate;
    use crate::qubit::QubitId;

    fn dag(n: u32) -> CircuitDag {
        CircuitDag::with_qubits(n, GateDurations::uniform(1.0))
    }

    #[test]
    fn test_commuting_gates_share_a_block() {
        let mut dag = dag(1);
        let a = dag.push_op(StandardGate::Rz(0.1), &[QubitId(0)]).unwrap();
        let b = dag.push_op(StandardGate::Z, &[QubitId(0)]).unwrap();
        let c = dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
        dag.detect_commutation();

        let q = QubitId(0);
        assert_eq!(dag.blocks(q), &[vec![a, b], vec![c]]);
        assert_eq!(dag.block_of(b, q), Some(0));
        assert_eq!(dag.block_of(c, q), Some(1));
        assert_eq!(dag.com_set(a), &[b]);
        assert!(dag.com_set(c).is_empty());
        assert!(dag.is_analyzed());
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_block_members_commute_pairwise() {
        // Rx(0) commutes with both neighbours, Z and X do not commute.
        let mut dag = dag(1);
        let q = QubitId(0);
        let z = dag.push_op(StandardGate::Z, &[q]).unwrap();
        let id = dag.push_op(StandardGate::Rx(0.0), &[q]).unwrap();
        let x = dag.push_op(StandardGate::X, &[q]).unwrap();
        dag.detect_commutation();

        assert_eq!(dag.blocks(q), &[vec![z, id], vec![x]]);
        assert!(dag.has_edge(z, x, q));
        assert!(dag.has_edge(id, x, q));
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_edges_rebuilt_between_adjacent_blocks() {
        let mut dag = dag(1);
        let a = dag.push_op(StandardGate::Rz(0.1), &[QubitId(0)]).unwrap();
        let b = dag.push_op(StandardGate::T, &[QubitId(0)]).unwrap();
        let c = dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
        dag.detect_commutation();

        let q = QubitId(0);
        assert!(!dag.has_edge(a, b, q));
        assert!(dag.has_edge(a, c, q));
        assert!(dag.has_edge(b, c, q));
        let mut preds = dag.pred_set(c).to_vec();
        preds.sort();
        assert_eq!(preds, vec![a, b]);
        assert_eq!(dag.suc_set(a), &[c]);
    }

    #[test]
    fn test_cnot_commutation_with_controls_and_targets() {
        let mut dag = dag(2);
        let (q0, q1) = (QubitId(0), QubitId(1));
        let rz = dag.push_op(StandardGate::Rz(0.4), &[q0]).unwrap();
        let cx = dag.push_op(StandardGate::Cnot, &[q0, q1]).unwrap();
        let x = dag.push_op(StandardGate::X, &[q1]).unwrap();
        let h = dag.push_op(StandardGate::H, &[q1]).unwrap();
        dag.detect_commutation();

        assert_eq!(dag.blocks(q0), &[vec![rz, cx]]);
        assert_eq!(dag.blocks(q1), &[vec![cx, x], vec![h]]);
        assert_eq!(dag.com_set(cx), &[rz, x]);
        assert_eq!(dag.com_set(rz), &[cx]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_multi_wire_peers_need_aligned_blocks() {
        // CZ(0,1) ; X(1) ; CZ(0,1): same block on wire 0, split on wire 1.
        let mut dag = dag(2);
        let (q0, q1) = (QubitId(0), QubitId(1));
        let first = dag.push_op(StandardGate::Cz, &[q0, q1]).unwrap();
        dag.push_op(StandardGate::X, &[q1]).unwrap();
        let second = dag.push_op(StandardGate::Cz, &[q0, q1]).unwrap();
        dag.detect_commutation();

        assert_eq!(dag.block_of(first, q0), dag.block_of(second, q0));
        assert_ne!(dag.block_of(first, q1), dag.block_of(second, q1));
        assert!(!dag.com_set(first).contains(&second));
        assert!(!dag.com_set(second).contains(&first));
    }

    #[test]
    fn test_measurement_never_commutes() {
        let mut dag = dag(1);
        dag.push_op(StandardGate::Z, &[QubitId(0)]).unwrap();
        dag.push_op(StandardGate::Measure, &[QubitId(0)]).unwrap();
        dag.detect_commutation();
        assert_eq!(dag.blocks(QubitId(0)).len(), 2);
    }

    #[test]
    fn test_adding_a_gate_invalidates_analysis() {
        let mut dag = dag(1);
        dag.push_op(StandardGate::Z, &[QubitId(0)]).unwrap();
        dag.detect_commutation();
        assert!(dag.is_analyzed());
        dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
        assert!(!dag.is_analyzed());
    }
}
