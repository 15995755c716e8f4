//! Fusing neighbouring gates into one aggregated gate.

use std::collections::VecDeque;

use petgraph::Direction;
use petgraph::visit::Dfs;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::aggregate::AggregatedGate;
use crate::dag::{CircuitDag, GateId};
use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// Result of a merge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Both gates were retired; this is the fused gate.
    Merged(GateId),
    /// The precondition failed and the DAG is untouched; this is the first
    /// argument.
    Unchanged(GateId),
}

impl MergeOutcome {
    /// The gate to continue with.
    pub fn gate(&self) -> GateId {
        match *self {
            MergeOutcome::Merged(g) | MergeOutcome::Unchanged(g) => g,
        }
    }

    /// Check whether a merge happened.
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged(_))
    }
}

impl CircuitDag {
    /// Check whether `a` and `b` may be fused.
    ///
    /// They must be distinct, share at least one wire, and on every shared
    /// wire either sit in the same commutation block or be joined by a
    /// direct edge. Pairs with a longer path between them are rejected, as
    /// fusing them would close a cycle.
    pub fn can_merge(&self, a: GateId, b: GateId) -> bool {
        if a == b || !self.analyzed {
            return false;
        }
        let (Some(ga), Some(gb)) = (self.gate(a), self.gate(b)) else {
            return false;
        };
        let shared: Vec<QubitId> = ga
            .qubits()
            .iter()
            .copied()
            .filter(|&w| gb.acts_on(w))
            .collect();
        if shared.is_empty() {
            return false;
        }
        for &w in &shared {
            let (Some(ba), Some(bb)) = (self.block_of(a, w), self.block_of(b, w)) else {
                return false;
            };
            if ba != bb && !self.has_edge(a, b, w) && !self.has_edge(b, a, w) {
                return false;
            }
        }
        !self.reaches_indirectly(a, b) && !self.reaches_indirectly(b, a)
    }

    /// A path `from -> x -> ... -> to` through at least one other gate.
    fn reaches_indirectly(&self, from: GateId, to: GateId) -> bool {
        let mut dfs = Dfs::empty(self.graph());
        dfs.stack.extend(
            self.graph()
                .neighbors_directed(from, Direction::Outgoing)
                .filter(|&g| g != to),
        );
        while let Some(g) = dfs.next(self.graph()) {
            if g == to {
                return true;
            }
        }
        false
    }

    /// Whether two gates are neighbours: on some shared wire they are in the
    /// same block or joined by an edge.
    fn adjacent(&self, a: GateId, b: GateId) -> bool {
        let (Some(ga), Some(gb)) = (self.gate(a), self.gate(b)) else {
            return false;
        };
        ga.qubits().iter().filter(|&&w| gb.acts_on(w)).any(|&w| {
            self.has_edge(a, b, w)
                || self.has_edge(b, a, w)
                || (self.block_of(a, w).is_some() && self.block_of(a, w) == self.block_of(b, w))
        })
    }

    /// Check that every member of a group is a neighbour of another member.
    pub fn can_merge_group(&self, group: &[GateId]) -> bool {
        if group.len() < 2 {
            return group.iter().all(|&g| self.contains(g));
        }
        group
            .iter()
            .all(|&g| group.iter().any(|&h| h != g && self.adjacent(g, h)))
    }

    /// Fuse `a` and `b` into one aggregated gate.
    ///
    /// If the pair fails [`can_merge`](Self::can_merge) the DAG is left as is
    /// and [`MergeOutcome::Unchanged`] is returned. Otherwise the gate that
    /// runs first becomes the predecessor half, both nodes are retired, and
    /// the fused gate takes over their blocks and dependencies:
    ///
    /// - on a wire only one of them touches, it takes that gate's block;
    /// - on a shared wire where both sit in one block, it joins that block;
    /// - on a shared wire where they sit in adjacent blocks, it gets a block
    ///   of its own between what remains of the two (reusing the
    ///   predecessor's block if that is left empty, and dropping the
    ///   successor's block if that is).
    ///
    /// In the op table the fused gate goes after every gate that sat between
    /// the two inputs and does not depend on either of them, and before the
    /// ones that do. Wire chains are then re-derived from the op table, so
    /// they keep agreeing with each other and with the edges.
    pub fn merge_gate(&mut self, a: GateId, b: GateId) -> IrResult<MergeOutcome> {
        if !self.can_merge(a, b) {
            return Ok(MergeOutcome::Unchanged(a));
        }

        let (p, s) = if self.runs_before(b, a) { (b, a) } else { (a, b) };
        let pg = self.gate_or_err(p)?.clone();
        let sg = self.gate_or_err(s)?.clone();
        let merged = AggregatedGate::concat(&pg, &sg);
        let wires = merged.qubits().to_vec();

        let mut touched: FxHashSet<GateId> = FxHashSet::default();
        for g in [p, s] {
            touched.extend(self.neighbourhood(g));
        }
        let (head, tail) = self.fused_order(p, s)?;

        let rt = self.add_node(merged);
        {
            let op_tab = self.op_tab_mut();
            op_tab.clear();
            op_tab.extend(head);
            op_tab.push(rt);
            op_tab.extend(tail);
        }

        let mut links: Vec<(QubitId, Vec<GateId>, Vec<GateId>)> = Vec::with_capacity(wires.len());
        for &w in &wires {
            match (pg.acts_on(w), sg.acts_on(w)) {
                (true, true) => links.push(self.splice_shared_wire(p, s, rt, w)?),
                (true, false) => links.push(self.splice_single_wire(p, rt, w)),
                (false, true) => links.push(self.splice_single_wire(s, rt, w)),
                (false, false) => {}
            }
        }

        for (w, preds, succs) in links {
            for g in preds {
                if g != p && g != s {
                    self.link(g, rt, w);
                }
            }
            for g in succs {
                if g != p && g != s {
                    self.link(rt, g, w);
                }
            }
        }

        self.detach(p)?;
        self.detach(s)?;
        self.rebuild_chains();

        touched.extend(self.neighbourhood(rt));
        touched.remove(&p);
        touched.remove(&s);
        self.refresh_adjacency(rt);
        self.refresh_com_set(rt);
        for g in touched {
            self.refresh_adjacency(g);
            self.refresh_com_set(g);
        }

        trace!(
            pred = p.index(),
            succ = s.index(),
            merged = rt.index(),
            "merged gates"
        );
        Ok(MergeOutcome::Merged(rt))
    }

    /// Whether `x` runs before `y`: along an edge on some shared wire or,
    /// when no edge joins them, earlier in the chain of their first shared
    /// wire.
    fn runs_before(&self, x: GateId, y: GateId) -> bool {
        let (Some(gx), Some(gy)) = (self.gate(x), self.gate(y)) else {
            return false;
        };
        let shared: Vec<QubitId> = gx
            .qubits()
            .iter()
            .copied()
            .filter(|&w| gy.acts_on(w))
            .collect();
        if shared.iter().any(|&w| self.has_edge(x, y, w)) {
            return true;
        }
        if shared.iter().any(|&w| self.has_edge(y, x, w)) {
            return false;
        }
        shared.first().is_some_and(|&w| {
            let chain = self.chain(w);
            let px = chain.iter().position(|&g| g == x);
            let py = chain.iter().position(|&g| g == y);
            px < py
        })
    }

    /// Op-table order around the gate fusing `p` and `s`: the gates that go
    /// in front of it and the ones that go behind it.
    ///
    /// Gates between the two inputs that depend on either of them move
    /// behind the fused gate; the rest keep their place in front.
    fn fused_order(&self, p: GateId, s: GateId) -> IrResult<(Vec<GateId>, Vec<GateId>)> {
        let op_tab = self.op_tab();
        let position = |id: GateId| op_tab.iter().position(|&g| g == id);
        let (Some(ip), Some(is)) = (position(p), position(s)) else {
            return Err(IrError::InvalidNode);
        };
        let (lo, hi) = (ip.min(is), ip.max(is));

        let mut dependent: FxHashSet<GateId> = FxHashSet::default();
        let mut dfs = Dfs::empty(self.graph());
        dfs.stack.extend([p, s]);
        while let Some(g) = dfs.next(self.graph()) {
            dependent.insert(g);
        }

        let mut head = op_tab[..lo].to_vec();
        let mut tail = Vec::new();
        for &g in &op_tab[lo + 1..hi] {
            if dependent.contains(&g) {
                tail.push(g);
            } else {
                head.push(g);
            }
        }
        tail.extend_from_slice(&op_tab[hi + 1..]);
        Ok((head, tail))
    }

    /// Graph neighbours and block-mates of `id`.
    fn neighbourhood(&self, id: GateId) -> Vec<GateId> {
        let mut out: Vec<GateId> = self.graph().neighbors_undirected(id).collect();
        out.extend(self.com_set(id).iter().copied());
        if let Some(gate) = self.gate(id) {
            for &w in gate.qubits() {
                if let Some(b) = self.block_of(id, w) {
                    out.extend(self.blocks(w)[b].iter().copied());
                }
            }
        }
        out
    }

    /// `rt` replaces `old` on a wire the other merged gate does not touch.
    fn splice_single_wire(
        &mut self,
        old: GateId,
        rt: GateId,
        w: QubitId,
    ) -> (QubitId, Vec<GateId>, Vec<GateId>) {
        let preds = self.preds(old, w);
        let succs = self.succs(old, w);
        if let Some(b) = self.block_index.remove(&(old, w)) {
            if let Some(slot) = self
                .blocks
                .get_mut(&w)
                .and_then(|bs| bs.get_mut(b))
                .and_then(|block| block.iter_mut().find(|g| **g == old))
            {
                *slot = rt;
            }
            self.block_index.insert((rt, w), b);
        }
        (w, preds, succs)
    }

    /// `rt` replaces both `p` and `s` on a wire they share.
    fn splice_shared_wire(
        &mut self,
        p: GateId,
        s: GateId,
        rt: GateId,
        w: QubitId,
    ) -> IrResult<(QubitId, Vec<GateId>, Vec<GateId>)> {
        let (Some(bp), Some(bs)) = (self.block_of(p, w), self.block_of(s, w)) else {
            return Err(IrError::NotAnalyzed);
        };
        let p_preds = self.preds(p, w);
        let s_succs = self.succs(s, w);

        if bp == bs {
            let mut preds = p_preds;
            for g in self.preds(s, w) {
                if !preds.contains(&g) {
                    preds.push(g);
                }
            }
            let mut succs = self.succs(p, w);
            for g in s_succs {
                if !succs.contains(&g) {
                    succs.push(g);
                }
            }

            for g in [p, s] {
                self.block_index.remove(&(g, w));
            }
            if let Some(block) = self.blocks.get_mut(&w).and_then(|bs| bs.get_mut(bp)) {
                let at = block
                    .iter()
                    .position(|g| *g == p || *g == s)
                    .unwrap_or(block.len());
                block.retain(|g| *g != p && *g != s);
                block.insert(at.min(block.len()), rt);
            }
            self.block_index.insert((rt, w), bp);
            return Ok((w, preds, succs));
        }

        if bs < bp {
            return Err(IrError::InvalidDag(format!(
                "merge predecessor sits after its successor on {w}"
            )));
        }

        for g in [p, s] {
            self.block_index.remove(&(g, w));
        }
        let (p_rest, s_rest) = {
            let blocks = self.blocks.get_mut(&w).ok_or(IrError::NotAnalyzed)?;
            blocks[bp].retain(|g| *g != p);
            blocks[bs].retain(|g| *g != s);
            (blocks[bp].clone(), blocks[bs].clone())
        };

        for &x in &p_rest {
            for &y in &s_rest {
                self.unlink(x, y, w);
            }
        }

        let preds = if p_rest.is_empty() { p_preds } else { p_rest.clone() };
        let succs = if s_rest.is_empty() { s_succs } else { s_rest };

        if self.blocks(w)[bs].is_empty() {
            self.remove_block(w, bs);
        }
        let index = if p_rest.is_empty() {
            bp
        } else {
            self.insert_block(w, bp + 1);
            bp + 1
        };
        self.assign_block(rt, w, index);

        Ok((w, preds, succs))
    }

    /// Fuse a group of mutually adjacent gates into one.
    ///
    /// Starting from the first member, the remaining members are tried in a
    /// rotating queue; a member that cannot be merged yet is put back. Stops
    /// when the queue is empty or a full rotation makes no progress. Returns
    /// the fused gate and the members left over.
    pub fn merge_group(&mut self, group: &[GateId]) -> IrResult<(GateId, Vec<GateId>)> {
        let Some((&first, rest)) = group.split_first() else {
            return Err(IrError::InvalidDag("cannot merge an empty group".into()));
        };
        let mut current = first;
        let mut queue: VecDeque<GateId> = rest.iter().copied().collect();
        let mut stalled = 0;
        while let Some(next) = queue.pop_front() {
            match self.merge_gate(current, next)? {
                MergeOutcome::Merged(g) => {
                    current = g;
                    stalled = 0;
                }
                MergeOutcome::Unchanged(_) => {
                    queue.push_back(next);
                    stalled += 1;
                    if stalled >= queue.len() {
                        break;
                    }
                }
            }
        }
        Ok((current, queue.into_iter().collect()))
    }
}
