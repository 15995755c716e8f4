//! Fusion of gate groups whose combined unitary is diagonal.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use qoc_ir::unitary::{ops_are_diagonal, wire_union};
use qoc_ir::{CircuitDag, GateId, QubitId, StandardGate};

use crate::config::CompileConfig;
use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Outcome of a [`DiagonalMerge`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagonalMergeReport {
    /// Groups selected for fusion.
    pub groups: usize,
    /// Gates absorbed into another gate.
    pub gates_fused: usize,
    /// Group members that never became mergeable with the rest of their group.
    pub leftovers: usize,
}

/// Fuses diagonal gate groups around every multi-wire gate.
///
/// For each multi-wire gate, in op-table order, candidate groups are built
/// from the gate plus:
///
/// - any subset of its commuting peers whose wires lie inside its own;
/// - a prefix of the following blocks on each of its wires, up to the
///   lookahead, stopping before a block with a gate on another wire or with
///   an H gate;
/// - any subset of its sole single-wire direct predecessors.
///
/// A group qualifies if none of its members is already claimed, it holds no
/// H, S, T or Tdag gate, it fits the block width when one is set, its unitary (members in topological order) is
/// diagonal, and its members are pairwise connected. The largest qualifying
/// group with at least two members is claimed; ties go to the first one
/// enumerated. Claimed groups are fused once every gate has been visited.
pub struct DiagonalMerge;

/// Shared state of one selection sweep.
struct Selector<'a> {
    dag: &'a CircuitDag,
    config: &'a CompileConfig,
    rank: FxHashMap<GateId, usize>,
    claimed: FxHashSet<GateId>,
}

impl<'a> Selector<'a> {
    fn new(dag: &'a CircuitDag, config: &'a CompileConfig) -> CompileResult<Self> {
        let rank = dag
            .topological_order()?
            .into_iter()
            .enumerate()
            .map(|(i, g)| (g, i))
            .collect();
        Ok(Self {
            dag,
            config,
            rank,
            claimed: FxHashSet::default(),
        })
    }

    fn is_subset(&self, candidate: GateId, wires: &[QubitId]) -> bool {
        self.dag
            .gate(candidate)
            .is_some_and(|g| g.qubits().iter().all(|w| wires.contains(w)))
    }

    fn has_hadamard(&self, id: GateId) -> bool {
        self.dag
            .gate(id)
            .is_some_and(|g| g.ops().iter().any(|op| *op.gate() == StandardGate::H))
    }

    /// The gate plus every subset of its in-wire commuting peers. Also
    /// reports whether all peers lie inside the gate's wires.
    fn commute_sets(&self, gate: GateId, wires: &[QubitId]) -> (Vec<Vec<GateId>>, bool) {
        let mut sets = vec![vec![gate]];
        let mut contained = true;
        let mut taken = 0;
        for &peer in self.dag.com_set(gate) {
            if !self.is_subset(peer, wires) {
                contained = false;
                continue;
            }
            if taken == self.config.max_commuting_peers {
                continue;
            }
            taken += 1;
            let extended: Vec<Vec<GateId>> = sets
                .iter()
                .map(|s| {
                    let mut s = s.clone();
                    s.push(peer);
                    s
                })
                .collect();
            sets.extend(extended);
        }
        (sets, contained)
    }

    /// Following blocks per wire that may join a diagonal group.
    fn lookahead_layers(&self, gate: GateId, wires: &[QubitId]) -> Vec<Vec<Vec<GateId>>> {
        wires
            .iter()
            .map(|&w| {
                let blocks = self.dag.blocks(w);
                let Some(idx) = self.dag.block_of(gate, w) else {
                    return Vec::new();
                };
                let end = blocks.len().min(idx + self.config.diagonal_lookahead);
                let mut layers = Vec::new();
                for block in blocks.iter().take(end).skip(idx + 1) {
                    let usable = block
                        .iter()
                        .all(|&g| self.is_subset(g, wires) && !self.has_hadamard(g));
                    if !usable {
                        break;
                    }
                    layers.push(block.clone());
                }
                layers
            })
            .collect()
    }

    /// Groups extending the commute sets with successor-block prefixes.
    ///
    /// A prefix length is chosen per wire. A multi-wire successor must be
    /// inside the prefix on all of its wires or on none.
    fn successor_sets(
        &self,
        wires: &[QubitId],
        layers: &[Vec<Vec<GateId>>],
        commute: &[Vec<GateId>],
    ) -> Vec<Vec<GateId>> {
        let position = |g: GateId, wire_idx: usize| {
            layers[wire_idx]
                .iter()
                .position(|layer| layer.contains(&g))
        };
        let multi: Vec<GateId> = layers
            .iter()
            .flatten()
            .flatten()
            .copied()
            .filter(|&g| self.dag.gate(g).is_some_and(|gate| gate.num_qubits() > 1))
            .collect();

        let mut sets = Vec::new();
        let mut prefix = vec![0usize; wires.len()];
        loop {
            let consistent = multi.iter().all(|&g| {
                let mut inside = wires.iter().enumerate().filter_map(|(i, &w)| {
                    let gate = self.dag.gate(g)?;
                    gate.acts_on(w)
                        .then(|| position(g, i).is_some_and(|p| p < prefix[i]))
                });
                let first = inside.next().unwrap_or(false);
                inside.all(|x| x == first)
            });
            if consistent && prefix.iter().any(|&k| k > 0) {
                let mut union: Vec<GateId> = Vec::new();
                for (i, &k) in prefix.iter().enumerate() {
                    for &g in layers[i][..k].iter().flatten() {
                        if !union.contains(&g) {
                            union.push(g);
                        }
                    }
                }
                for base in commute {
                    let mut set = union.clone();
                    set.extend(base);
                    sets.push(set);
                }
            }

            // Odometer over prefix lengths 0..=layers[i].len().
            let mut i = 0;
            loop {
                if i == prefix.len() {
                    return sets;
                }
                if prefix[i] < layers[i].len() {
                    prefix[i] += 1;
                    break;
                }
                prefix[i] = 0;
                i += 1;
            }
        }
    }

    /// Groups extending `bases` with any subset of the gate's sole
    /// single-wire direct predecessors.
    fn predecessor_sets(
        &self,
        gate: GateId,
        wires: &[QubitId],
        bases: &[Vec<GateId>],
    ) -> Vec<Vec<GateId>> {
        let singles: Vec<GateId> = wires
            .iter()
            .filter_map(|&w| match self.dag.preds(gate, w).as_slice() {
                &[p] if self.dag.gate(p).is_some_and(|g| g.num_qubits() == 1) => Some(p),
                _ => None,
            })
            .collect();

        let mut sets = Vec::new();
        for mask in 1..(1usize << singles.len()) {
            for base in bases {
                let mut set = base.clone();
                set.extend(
                    singles
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, &p)| p),
                );
                sets.push(set);
            }
        }
        sets
    }

    /// Dedup, order topologically and check one candidate group.
    fn qualify(&self, candidate: &[GateId], best: usize) -> Option<Vec<GateId>> {
        let mut group: Vec<GateId> = Vec::with_capacity(candidate.len());
        for &g in candidate {
            if !group.contains(&g) {
                group.push(g);
            }
        }
        if group.len() < best.max(2) || group.iter().any(|g| self.claimed.contains(g)) {
            return None;
        }
        let excluded = group.iter().any(|&g| {
            self.dag
                .gate(g)
                .is_none_or(|gate| gate.ops().iter().any(|op| op.gate().blocks_diagonal_merge()))
        });
        if excluded {
            return None;
        }
        group.sort_by_key(|g| self.rank.get(g).copied().unwrap_or(usize::MAX));

        let ops = group
            .iter()
            .filter_map(|&g| self.dag.gate(g))
            .flat_map(|gate| gate.ops());
        if let Some(width) = self.config.block_width {
            if wire_union(ops.clone()).len() > width {
                return None;
            }
        }
        if !ops_are_diagonal(ops) || !self.dag.can_merge_group(&group) {
            return None;
        }
        Some(group)
    }

    /// Pick the largest diagonal group around `gate`.
    fn select(&self, gate: GateId) -> Option<Vec<GateId>> {
        let wires = self.dag.gate(gate)?.qubits().to_vec();
        let (commute, contained) = self.commute_sets(gate, &wires);
        let layers = self.lookahead_layers(gate, &wires);
        let successors = self.successor_sets(&wires, &layers, &commute);

        let pred_bases: Vec<Vec<GateId>> = if contained {
            commute.iter().chain(&successors).cloned().collect()
        } else {
            commute.clone()
        };
        let predecessors = self.predecessor_sets(gate, &wires, &pred_bases);

        let mut best: Option<Vec<GateId>> = None;
        for candidate in commute.iter().chain(&successors).chain(&predecessors) {
            let floor = best.as_ref().map_or(0, |b| b.len() + 1);
            if let Some(group) = self.qualify(candidate, floor) {
                best = Some(group);
            }
        }
        best
    }
}

impl Pass for DiagonalMerge {
    fn name(&self) -> &'static str {
        "diagonal_merge"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        if !dag.is_analyzed() {
            dag.detect_commutation();
        }

        let groups = {
            let mut selector = Selector::new(dag, &properties.config)?;
            let mut groups = Vec::new();
            for &gate in dag.op_tab() {
                let multi_wire = dag.gate(gate).is_some_and(|g| g.num_qubits() > 1);
                if !multi_wire || selector.claimed.contains(&gate) {
                    continue;
                }
                if let Some(group) = selector.select(gate) {
                    trace!(anchor = gate.index(), size = group.len(), "claimed diagonal group");
                    selector.claimed.extend(group.iter().copied());
                    groups.push(group);
                }
            }
            groups
        };

        let mut report = DiagonalMergeReport {
            groups: groups.len(),
            ..DiagonalMergeReport::default()
        };
        for group in &groups {
            let (_, leftovers) = dag.merge_group(group)?;
            report.gates_fused += group.len() - 1 - leftovers.len();
            report.leftovers += leftovers.len();
        }
        properties.schedule = None;

        debug!(
            groups = report.groups,
            fused = report.gates_fused,
            leftovers = report.leftovers,
            "diagonal merge complete"
        );
        properties.insert(report);
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, _properties: &PropertySet) -> bool {
        dag.op_tab()
            .iter()
            .any(|&g| dag.gate(g).is_some_and(|gate| gate.num_qubits() > 1))
    }
}
