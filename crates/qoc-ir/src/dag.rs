//! DAG of aggregated gates.
//!
//! Nodes live in a `StableDiGraph` arena and are addressed by [`GateId`]
//! handles that stay valid until the node is removed. Every edge carries the
//! wire it runs along, so "g2 is a successor of g1 on w" and "g1 is a
//! predecessor of g2 on w" are the same fact.

use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graphmap::DiGraphMap;
use petgraph::stable_graph::{EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::aggregate::AggregatedGate;
use crate::duration::GateDurations;
use crate::error::{IrError, IrResult};
use crate::gate::{AtomicOp, StandardGate};
use crate::qubit::{Qubit, QubitId};

/// Handle of a gate in the circuit DAG.
pub type GateId = NodeIndex<u32>;

type Graph = StableDiGraph<AggregatedGate, DagEdge, u32>;

/// An edge in the circuit DAG: a dependency along one wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DagEdge {
    /// The wire this dependency runs along.
    pub wire: QubitId,
}

/// Mutable circuit DAG with per-wire chains and commutation bookkeeping.
///
/// - `op_tab` lists every live gate once, in roughly program order.
/// - Each wire keeps a chain of the gates touching it, in program order.
/// - After [`detect_commutation`](Self::detect_commutation), each wire's
///   chain is partitioned into commutation blocks, and the flattened
///   predecessor / successor / commuting-peer sets are filled in.
///
/// Retired gates are removed from the arena; nothing keeps pointing at them.
#[derive(Debug, Clone)]
pub struct CircuitDag {
    graph: StableDiGraph<AggregatedGate, DagEdge, u32>,
    qubits: Vec<Qubit>,
    names: FxHashMap<String, QubitId>,
    durations: GateDurations,
    op_tab: Vec<GateId>,
    qb_tab: FxHashMap<QubitId, Vec<GateId>>,
    pub(crate) blocks: FxHashMap<QubitId, Vec<Vec<GateId>>>,
    pub(crate) block_index: FxHashMap<(GateId, QubitId), usize>,
    pred_set: FxHashMap<GateId, Vec<GateId>>,
    suc_set: FxHashMap<GateId, Vec<GateId>>,
    pub(crate) com_set: FxHashMap<GateId, Vec<GateId>>,
    pub(crate) analyzed: bool,
}

impl CircuitDag {
    /// Create an empty DAG that will look gate durations up in `durations`.
    pub fn new(durations: GateDurations) -> Self {
        Self {
            graph: StableDiGraph::default(),
            qubits: Vec::new(),
            names: FxHashMap::default(),
            durations,
            op_tab: Vec::new(),
            qb_tab: FxHashMap::default(),
            blocks: FxHashMap::default(),
            block_index: FxHashMap::default(),
            pred_set: FxHashMap::default(),
            suc_set: FxHashMap::default(),
            com_set: FxHashMap::default(),
            analyzed: false,
        }
    }

    /// Create a DAG with `n` wires named `q0 .. q{n-1}`.
    pub fn with_qubits(n: u32, durations: GateDurations) -> Self {
        let mut dag = Self::new(durations);
        for i in 0..n {
            let id = QubitId(i);
            dag.names.insert(format!("q{i}"), id);
            dag.qubits.push(Qubit::new(id, format!("q{i}")));
            dag.qb_tab.insert(id, Vec::new());
            dag.blocks.insert(id, Vec::new());
        }
        dag
    }

    /// Declare a wire.
    pub fn add_qubit(&mut self, name: impl Into<String>) -> IrResult<QubitId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(IrError::DuplicateDeclaration(name));
        }
        let index = u32::try_from(self.qubits.len())
            .map_err(|_| IrError::InvalidDag("too many qubits".into()))?;
        let id = QubitId(index);
        self.names.insert(name.clone(), id);
        self.qubits.push(Qubit::new(id, name));
        self.qb_tab.insert(id, Vec::new());
        self.blocks.insert(id, Vec::new());
        Ok(id)
    }

    /// Look a wire up by its declared name.
    pub fn qubit_id(&self, name: &str) -> Option<QubitId> {
        self.names.get(name).copied()
    }

    /// Declared name of a wire.
    pub fn qubit_name(&self, id: QubitId) -> Option<&str> {
        self.qubits
            .get(id.0 as usize)
            .filter(|q| q.id == id)
            .map(|q| q.name.as_str())
    }

    /// Declared wires, in declaration order.
    pub fn qubits(&self) -> &[Qubit] {
        &self.qubits
    }

    /// Declared wire identifiers, in declaration order.
    pub fn qubit_ids(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.qubits.iter().map(|q| q.id)
    }

    /// Number of declared wires.
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Check whether a wire is declared.
    pub fn has_qubit(&self, id: QubitId) -> bool {
        self.qb_tab.contains_key(&id)
    }

    /// The gate-duration table.
    pub fn durations(&self) -> &GateDurations {
        &self.durations
    }

    /// Build an atomic operation, looking its duration up in the table.
    pub fn atomic_op(&self, gate: StandardGate, qubits: Vec<QubitId>) -> IrResult<AtomicOp> {
        let duration = self.durations.get(&gate)?;
        AtomicOp::new(gate, qubits, duration)
    }

    /// Append a gate.
    ///
    /// On each of its wires the gate becomes the successor of the wire's
    /// current tail and is then appended to the wire's chain.
    pub fn add_gate(&mut self, gate: AggregatedGate) -> IrResult<GateId> {
        for &q in gate.qubits() {
            if !self.has_qubit(q) {
                return Err(IrError::QubitNotFound {
                    qubit: q,
                    gate_index: Some(self.op_tab.len()),
                    gate_name: Some(gate.label()),
                });
            }
        }

        let wires = gate.qubits().to_vec();
        let id = self.graph.add_node(gate);
        self.op_tab.push(id);
        for w in wires {
            let chain = self.qb_tab.entry(w).or_default();
            let tail = chain.last().copied();
            chain.push(id);
            if let Some(tail) = tail {
                self.link(tail, id, w);
            }
        }
        self.analyzed = false;
        Ok(id)
    }

    /// Wrap one operation in its own aggregated gate and append it.
    pub fn push_op(&mut self, gate: StandardGate, qubits: &[QubitId]) -> IrResult<GateId> {
        for &q in qubits {
            if !self.has_qubit(q) {
                return Err(IrError::QubitNotFound {
                    qubit: q,
                    gate_index: Some(self.op_tab.len()),
                    gate_name: Some(gate.name().to_string()),
                });
            }
        }
        let op = self.atomic_op(gate, qubits.to_vec())?;
        self.add_gate(AggregatedGate::single(op))
    }

    /// Get a live gate.
    #[inline]
    pub fn gate(&self, id: GateId) -> Option<&AggregatedGate> {
        self.graph.node_weight(id)
    }

    /// Check whether a handle refers to a live gate.
    #[inline]
    pub fn contains(&self, id: GateId) -> bool {
        self.graph.contains_node(id)
    }

    pub(crate) fn gate_or_err(&self, id: GateId) -> IrResult<&AggregatedGate> {
        self.gate(id).ok_or(IrError::InvalidNode)
    }

    /// Live gates in op-table order.
    pub fn op_tab(&self) -> &[GateId] {
        &self.op_tab
    }

    /// Number of live gates.
    pub fn num_gates(&self) -> usize {
        self.op_tab.len()
    }

    /// Number of atomic operations across all gates.
    pub fn num_ops(&self) -> usize {
        self.op_tab
            .iter()
            .filter_map(|&id| self.gate(id))
            .map(|g| g.ops().len())
            .sum()
    }

    /// Check if the DAG has no gates.
    pub fn is_empty(&self) -> bool {
        self.op_tab.is_empty()
    }

    /// Gates touching `wire`, in program order.
    pub fn chain(&self, wire: QubitId) -> &[GateId] {
        self.qb_tab.get(&wire).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct predecessors of `id` along `wire`.
    pub fn preds(&self, id: GateId, wire: QubitId) -> Vec<GateId> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .filter(|e| e.weight().wire == wire)
            .map(|e| e.source())
            .collect()
    }

    /// Direct successors of `id` along `wire`.
    pub fn succs(&self, id: GateId, wire: QubitId) -> Vec<GateId> {
        self.graph
            .edges_directed(id, Direction::Outgoing)
            .filter(|e| e.weight().wire == wire)
            .map(|e| e.target())
            .collect()
    }

    /// Check for a dependency `from -> to` along `wire`.
    pub fn has_edge(&self, from: GateId, to: GateId, wire: QubitId) -> bool {
        self.graph
            .edges_connecting(from, to)
            .any(|e| e.weight().wire == wire)
    }

    /// Add the dependency `from -> to` along `wire` unless already present.
    ///
    /// Returns whether an edge was added.
    pub fn link(&mut self, from: GateId, to: GateId, wire: QubitId) -> bool {
        if from == to || self.has_edge(from, to, wire) {
            return false;
        }
        self.graph.add_edge(from, to, DagEdge { wire });
        true
    }

    /// Remove the dependency `from -> to` along `wire`, if present.
    pub fn unlink(&mut self, from: GateId, to: GateId, wire: QubitId) -> bool {
        let edge = self
            .graph
            .edges_connecting(from, to)
            .find(|e| e.weight().wire == wire)
            .map(|e| e.id());
        match edge {
            Some(e) => self.graph.remove_edge(e).is_some(),
            None => false,
        }
    }

    /// Commutation blocks of `wire`, in chain order.
    pub fn blocks(&self, wire: QubitId) -> &[Vec<GateId>] {
        self.blocks.get(&wire).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the block holding `id` on `wire`.
    pub fn block_of(&self, id: GateId, wire: QubitId) -> Option<usize> {
        self.block_index.get(&(id, wire)).copied()
    }

    /// Deduplicated predecessors of `id` over all its wires.
    pub fn pred_set(&self, id: GateId) -> &[GateId] {
        self.pred_set.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Deduplicated successors of `id` over all its wires.
    pub fn suc_set(&self, id: GateId) -> &[GateId] {
        self.suc_set.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Other gates that commute with `id`. Never contains `id` itself.
    pub fn com_set(&self, id: GateId) -> &[GateId] {
        self.com_set.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether commutation blocks reflect the current chains.
    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    /// Assign (or clear) a gate's scheduled start time.
    pub fn set_start_time(&mut self, id: GateId, start: Option<f64>) -> IrResult<()> {
        let gate = self.graph.node_weight_mut(id).ok_or(IrError::InvalidNode)?;
        gate.set_start_time(start);
        Ok(())
    }

    /// The underlying graph.
    pub fn graph(&self) -> &StableDiGraph<AggregatedGate, DagEdge, u32> {
        &self.graph
    }

    /// Gates in a topological order of the dependency edges.
    pub fn topological_order(&self) -> IrResult<Vec<GateId>> {
        petgraph::algo::toposort(&self.graph, None)
            .map_err(|cycle| IrError::InvalidDag(format!("cycle through {:?}", cycle.node_id())))
    }

    /// Gates in an order consistent with every wire chain.
    ///
    /// Unlike [`topological_order`](Self::topological_order) this keeps
    /// members of a commutation block in program order.
    pub fn chain_order(&self) -> IrResult<Vec<GateId>> {
        let mut order: DiGraphMap<GateId, ()> = DiGraphMap::new();
        for &g in &self.op_tab {
            order.add_node(g);
        }
        for q in self.qubit_ids() {
            for pair in self.chain(q).windows(2) {
                order.add_edge(pair[0], pair[1], ());
            }
        }
        petgraph::algo::toposort(&order, None).map_err(|cycle| {
            IrError::InvalidDag(format!("wire chains disagree at {:?}", cycle.node_id()))
        })
    }

    pub(crate) fn graph_mut(&mut self) -> &mut StableDiGraph<AggregatedGate, DagEdge, u32> {
        &mut self.graph
    }

    pub(crate) fn add_node(&mut self, gate: AggregatedGate) -> GateId {
        self.graph.add_node(gate)
    }

    /// Recompute the flattened predecessor and successor sets of `id`.
    pub(crate) fn refresh_adjacency(&mut self, id: GateId) {
        if !self.contains(id) {
            self.pred_set.remove(&id);
            self.suc_set.remove(&id);
            return;
        }
        let mut preds = Vec::new();
        let mut succs = Vec::new();
        for e in self.graph.edges_directed(id, Direction::Incoming) {
            if !preds.contains(&e.source()) {
                preds.push(e.source());
            }
        }
        for e in self.graph.edges_directed(id, Direction::Outgoing) {
            if !succs.contains(&e.target()) {
                succs.push(e.target());
            }
        }
        self.pred_set.insert(id, preds);
        self.suc_set.insert(id, succs);
    }

    /// Everything whose derived sets may mention `id`.
    fn related_gates(&self, id: GateId) -> Vec<GateId> {
        let mut related: Vec<GateId> = self
            .graph
            .neighbors_undirected(id)
            .chain(self.pred_set(id).iter().copied())
            .chain(self.suc_set(id).iter().copied())
            .chain(self.com_set(id).iter().copied())
            .collect();
        if let Some(gate) = self.gate(id) {
            for &w in gate.qubits() {
                if let Some(b) = self.block_of(id, w) {
                    related.extend(self.blocks(w)[b].iter().copied());
                }
            }
        }
        let mut seen = FxHashSet::default();
        related.retain(|g| *g != id && seen.insert(*g));
        related
    }

    /// Remove a gate without touching its neighbours' dependencies.
    ///
    /// The gate disappears from the op table, its wire chains, its
    /// commutation blocks (which may become empty) and every derived set.
    pub fn detach(&mut self, id: GateId) -> IrResult<AggregatedGate> {
        let wires = self.gate_or_err(id)?.qubits().to_vec();
        let related = self.related_gates(id);

        self.op_tab.retain(|&g| g != id);
        for w in wires {
            if let Some(chain) = self.qb_tab.get_mut(&w) {
                chain.retain(|&g| g != id);
            }
            if let Some(b) = self.block_index.remove(&(id, w)) {
                if let Some(block) = self.blocks.get_mut(&w).and_then(|bs| bs.get_mut(b)) {
                    block.retain(|&g| g != id);
                }
            }
        }
        self.pred_set.remove(&id);
        self.suc_set.remove(&id);
        self.com_set.remove(&id);
        for g in related {
            for set in [&mut self.pred_set, &mut self.suc_set, &mut self.com_set] {
                if let Some(list) = set.get_mut(&g) {
                    list.retain(|&x| x != id);
                }
            }
        }

        trace!(gate = id.index(), "detached gate");
        self.graph.remove_node(id).ok_or(IrError::InvalidNode)
    }

    /// Remove a gate, bridging its dependencies.
    ///
    /// On each wire, a successor left without any predecessor on that wire
    /// adopts all of the removed gate's predecessors there.
    pub fn remove_gate(&mut self, id: GateId) -> IrResult<AggregatedGate> {
        let wires = self.gate_or_err(id)?.qubits().to_vec();
        let mut touched = Vec::new();
        for &w in &wires {
            let preds = self.preds(id, w);
            let succs = self.succs(id, w);
            for &s in &succs {
                self.unlink(id, s, w);
                if self.preds(s, w).is_empty() {
                    for &p in &preds {
                        self.link(p, s, w);
                    }
                }
            }
            touched.extend(preds);
            touched.extend(succs);
        }
        let removed = self.detach(id)?;
        for g in touched {
            self.refresh_adjacency(g);
        }
        Ok(removed)
    }

    /// Replace `removed` by a single new gate.
    ///
    /// The new gate takes the first removed gate's slot in the op table, in
    /// each wire chain and in each commutation block. Its wires must be a
    /// subset of that gate's wires. On each wire it depends on the union of
    /// the removed gates' outside predecessors and feeds the union of their
    /// outside successors.
    pub fn substitute(&mut self, removed: &[GateId], gate: AggregatedGate) -> IrResult<GateId> {
        let Some(&anchor) = removed.first() else {
            return Err(IrError::InvalidDag("substitution without gates to replace".into()));
        };
        for &r in removed {
            self.gate_or_err(r)?;
        }
        let anchor_gate = self.gate_or_err(anchor)?;
        if let Some(&w) = gate.qubits().iter().find(|&&w| !anchor_gate.acts_on(w)) {
            return Err(IrError::InvalidDag(format!(
                "substitute touches {w}, which the replaced gate does not"
            )));
        }

        let wires = gate.qubits().to_vec();
        let mut links: Vec<(QubitId, Vec<GateId>, Vec<GateId>)> = Vec::new();
        let mut touched: Vec<GateId> = Vec::new();
        for &w in &wires {
            let mut preds = Vec::new();
            let mut succs = Vec::new();
            for &r in removed {
                for p in self.preds(r, w) {
                    if !removed.contains(&p) && !preds.contains(&p) {
                        preds.push(p);
                    }
                }
                for s in self.succs(r, w) {
                    if !removed.contains(&s) && !succs.contains(&s) {
                        succs.push(s);
                    }
                }
            }
            links.push((w, preds, succs));
        }
        for &r in removed {
            touched.extend(self.related_gates(r));
        }

        let id = self.add_node(gate);
        if let Some(slot) = self.op_tab.iter_mut().find(|g| **g == anchor) {
            *slot = id;
        }
        for &w in &wires {
            if let Some(slot) = self
                .qb_tab
                .get_mut(&w)
                .and_then(|chain| chain.iter_mut().find(|g| **g == anchor))
            {
                *slot = id;
            }
            if let Some(b) = self.block_index.remove(&(anchor, w)) {
                if let Some(slot) = self
                    .blocks
                    .get_mut(&w)
                    .and_then(|bs| bs.get_mut(b))
                    .and_then(|block| block.iter_mut().find(|g| **g == anchor))
                {
                    *slot = id;
                }
                self.block_index.insert((id, w), b);
            }
        }
        for (w, preds, succs) in links {
            for p in preds {
                self.link(p, id, w);
            }
            for s in succs {
                self.link(id, s, w);
            }
        }
        for &r in removed {
            self.detach(r)?;
        }

        self.refresh_adjacency(id);
        touched.retain(|g| !removed.contains(g));
        for &g in &touched {
            self.refresh_adjacency(g);
        }
        if self.analyzed {
            self.refresh_com_set(id);
            for g in touched {
                self.refresh_com_set(g);
            }
        }
        Ok(id)
    }

    /// Recompute the commuting-peer set of a live gate.
    pub(crate) fn refresh_com_set(&mut self, id: GateId) {
        if self.contains(id) {
            let peers = self.gate_commutation_set(id);
            self.com_set.insert(id, peers);
        } else {
            self.com_set.remove(&id);
        }
    }

    pub(crate) fn op_tab_mut(&mut self) -> &mut Vec<GateId> {
        &mut self.op_tab
    }

    /// Re-derive every wire chain from the op-table order.
    pub(crate) fn rebuild_chains(&mut self) {
        for chain in self.qb_tab.values_mut() {
            chain.clear();
        }
        for &g in &self.op_tab {
            if let Some(gate) = self.graph.node_weight(g) {
                for &w in gate.qubits() {
                    self.qb_tab.entry(w).or_default().push(g);
                }
            }
        }
    }

    /// Insert an empty block at `index` on `wire`, shifting later blocks.
    pub(crate) fn insert_block(&mut self, wire: QubitId, index: usize) {
        let blocks = self.blocks.entry(wire).or_default();
        let index = index.min(blocks.len());
        blocks.insert(index, Vec::new());
        for (b, block) in blocks.iter().enumerate().skip(index + 1) {
            for &g in block {
                self.block_index.insert((g, wire), b);
            }
        }
    }

    /// Delete the (empty) block at `index` on `wire`, shifting later blocks.
    pub(crate) fn remove_block(&mut self, wire: QubitId, index: usize) {
        let Some(blocks) = self.blocks.get_mut(&wire) else {
            return;
        };
        if index >= blocks.len() {
            return;
        }
        for g in blocks.remove(index) {
            self.block_index.remove(&(g, wire));
        }
        for (b, block) in blocks.iter().enumerate().skip(index) {
            for &g in block {
                self.block_index.insert((g, wire), b);
            }
        }
    }

    /// Put `id` into block `index` on `wire`.
    pub(crate) fn assign_block(&mut self, id: GateId, wire: QubitId, index: usize) {
        if let Some(block) = self.blocks.get_mut(&wire).and_then(|bs| bs.get_mut(index)) {
            block.push(id);
            self.block_index.insert((id, wire), index);
        }
    }

    /// Render the dependency graph in Graphviz DOT.
    ///
    /// Nodes are labelled with their op-table position and op names, edges
    /// with the wire they run along.
    pub fn to_dot(&self) -> String {
        let positions: FxHashMap<GateId, usize> = self
            .op_tab
            .iter()
            .enumerate()
            .map(|(i, &g)| (g, i))
            .collect();
        let edge_label = |_: &Graph, e: EdgeReference<'_, DagEdge, u32>| {
            let wire = e.weight().wire;
            let name = self
                .qubit_name(wire)
                .map_or_else(|| wire.to_string(), str::to_string);
            format!("label = \"{name}\"")
        };
        let node_label = |_: &Graph, (id, gate): (GateId, &AggregatedGate)| {
            let pos = positions.get(&id).copied().unwrap_or(usize::MAX);
            format!("label = \"{pos}: {}\"", gate.label())
        };
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &edge_label,
            &node_label,
        );
        format!("{dot:?}")
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that:
    /// - The graph is acyclic
    /// - `op_tab` lists every live gate exactly once
    /// - Each wire chain holds exactly the live gates on that wire, in
    ///   op-table order, so all chains agree on one global order
    /// - Every edge joins two gates on its wire, in chain order
    /// - After analysis, blocks partition each chain in chain order and
    ///   agree with the reverse index
    /// - Derived sets mention only live gates and `com_set` never a gate itself
    #[allow(clippy::too_many_lines)]
    pub fn verify_integrity(&self) -> IrResult<()> {
        if petgraph::algo::is_cyclic_directed(&self.graph) {
            return Err(IrError::InvalidDag("Graph contains a cycle".into()));
        }

        let live: FxHashSet<GateId> = self.graph.node_indices().collect();
        let listed: FxHashSet<GateId> = self.op_tab.iter().copied().collect();
        if listed.len() != self.op_tab.len() || listed != live {
            return Err(IrError::InvalidDag(
                "op table does not list every live gate exactly once".into(),
            ));
        }

        let op_pos: FxHashMap<GateId, usize> =
            self.op_tab.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        let mut chain_pos: FxHashMap<(GateId, QubitId), usize> = FxHashMap::default();
        for q in self.qubit_ids() {
            let mut last = None;
            for (pos, &g) in self.chain(q).iter().enumerate() {
                let gate = self
                    .gate(g)
                    .ok_or_else(|| IrError::InvalidDag(format!("chain of {q} holds a dead gate")))?;
                if !gate.acts_on(q) {
                    return Err(IrError::InvalidDag(format!(
                        "chain of {q} holds a gate not acting on it"
                    )));
                }
                if chain_pos.insert((g, q), pos).is_some() {
                    return Err(IrError::InvalidDag(format!("gate twice in chain of {q}")));
                }
                let at = op_pos.get(&g).copied();
                if at <= last {
                    return Err(IrError::InvalidDag(format!(
                        "chain of {q} disagrees with the op table"
                    )));
                }
                last = at;
            }
        }
        for &g in &self.op_tab {
            if let Some(gate) = self.gate(g) {
                for &q in gate.qubits() {
                    if !chain_pos.contains_key(&(g, q)) {
                        return Err(IrError::InvalidDag(format!(
                            "gate missing from chain of {q}"
                        )));
                    }
                }
            }
        }

        for e in self.graph.edge_references() {
            let wire = e.weight().wire;
            let (Some(&from), Some(&to)) = (
                chain_pos.get(&(e.source(), wire)),
                chain_pos.get(&(e.target(), wire)),
            ) else {
                return Err(IrError::InvalidDag(format!(
                    "edge on {wire} joins a gate not on that wire"
                )));
            };
            if from >= to {
                return Err(IrError::InvalidDag(format!(
                    "edge on {wire} runs against chain order"
                )));
            }
        }

        if self.analyzed {
            for q in self.qubit_ids() {
                let mut last_block = 0;
                for &g in self.chain(q) {
                    let b = self.block_of(g, q).ok_or_else(|| {
                        IrError::InvalidDag(format!("gate without a block on {q}"))
                    })?;
                    if b < last_block {
                        return Err(IrError::InvalidDag(format!(
                            "blocks on {q} out of chain order"
                        )));
                    }
                    if !self.blocks(q).get(b).is_some_and(|block| block.contains(&g)) {
                        return Err(IrError::InvalidDag(format!(
                            "block index on {q} disagrees with block contents"
                        )));
                    }
                    last_block = b;
                }
                let members: usize = self.blocks(q).iter().map(Vec::len).sum();
                if members != self.chain(q).len() {
                    return Err(IrError::InvalidDag(format!(
                        "blocks on {q} do not partition its chain"
                    )));
                }
            }
        }

        for (set_name, set) in [
            ("pred_set", &self.pred_set),
            ("suc_set", &self.suc_set),
            ("com_set", &self.com_set),
        ] {
            for (g, members) in set {
                if !live.contains(g) || members.iter().any(|m| !live.contains(m)) {
                    return Err(IrError::InvalidDag(format!(
                        "{set_name} mentions a retired gate"
                    )));
                }
            }
        }
        for (g, peers) in &self.com_set {
            if peers.contains(g) {
                return Err(IrError::InvalidDag("gate listed as its own peer".into()));
            }
        }

        Ok(())
    }
}
