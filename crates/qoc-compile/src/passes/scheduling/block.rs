//! Width-bounded block merging driven by the schedule.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use qoc_ir::{CircuitDag, GateId, MergeOutcome, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::TIME_EPSILON;

/// Outcome of a [`BlockMerge`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockMergeReport {
    /// Successful pairwise merges.
    pub merges: usize,
    /// Queue entries processed.
    pub rounds: usize,
    /// Gates whose merge loop hit the attempt cap. Zero means the pass
    /// converged.
    pub capped_gates: usize,
}

/// Merges each gate with the neighbours it can absorb without delaying
/// anything the schedule already placed, as long as the merged wire set
/// stays within the configured width.
///
/// Needs start times on every gate, so it runs after the list scheduler.
pub struct BlockMerge;

fn window(dag: &CircuitDag, id: GateId) -> Option<(f64, f64)> {
    let gate = dag.gate(id)?;
    Some((gate.start_time()?, gate.finish_time()?))
}

fn union(a: &[GateId], b: &[GateId]) -> Vec<GateId> {
    let mut out = a.to_vec();
    for &g in b {
        if !out.contains(&g) {
            out.push(g);
        }
    }
    out
}

/// Predecessors, successors and commuting peers of `c` that can be merged
/// into it without moving any other gate's start time.
fn gate_merge_set(dag: &CircuitDag, c: GateId) -> Vec<GateId> {
    let Some((c_start, c_finish)) = window(dag, c) else {
        return Vec::new();
    };
    let mut out = Vec::new();

    let before = union(dag.pred_set(c), dag.com_set(c));
    for &m in &before {
        let Some((m_start, _)) = window(dag, m) else {
            continue;
        };
        // Nothing else c waits for may still be running when m starts.
        let blocked = before.iter().any(|&k| {
            k != m && window(dag, k).is_none_or(|(_, f)| f > m_start + TIME_EPSILON)
        });
        if blocked {
            continue;
        }
        // Nothing else after m may start before c is done.
        let blocked = union(dag.suc_set(m), dag.com_set(m)).iter().any(|&k| {
            k != c && window(dag, k).is_none_or(|(s, _)| s < c_finish - TIME_EPSILON)
        });
        if !blocked && !out.contains(&m) {
            out.push(m);
        }
    }

    let after = union(dag.suc_set(c), dag.com_set(c));
    for &m in &after {
        let Some((_, m_finish)) = window(dag, m) else {
            continue;
        };
        // Nothing else m waits for may still be running when c starts.
        let blocked = union(dag.pred_set(m), dag.com_set(m)).iter().any(|&k| {
            k != c && window(dag, k).is_none_or(|(_, f)| f > c_start + TIME_EPSILON)
        });
        if blocked {
            continue;
        }
        // Nothing else after c may start after m is done.
        let blocked = after.iter().any(|&k| {
            k != c && window(dag, k).is_none_or(|(s, _)| s > m_finish + TIME_EPSILON)
        });
        if !blocked && !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

fn wire_count(dag: &CircuitDag, gates: &[GateId]) -> usize {
    let mut wires: Vec<QubitId> = Vec::new();
    for gate in gates.iter().filter_map(|&g| dag.gate(g)) {
        for &w in gate.qubits() {
            if !wires.contains(&w) {
                wires.push(w);
            }
        }
    }
    wires.len()
}

/// Grow `{c}` by merge sets until it stops changing or would exceed
/// `width` wires; the last set within the budget is returned, `c` first.
fn neighbourhood(dag: &CircuitDag, c: GateId, width: usize) -> Vec<GateId> {
    let mut current = vec![c];
    loop {
        let mut next = current.clone();
        for &g in &current {
            next = union(&next, &gate_merge_set(dag, g));
        }
        if next.len() == current.len() || wire_count(dag, &next) > width {
            return current;
        }
        current = next;
    }
}

/// Neighbourhood of every gate, and for every gate the neighbourhoods it
/// appears in.
struct Neighbourhoods {
    width: usize,
    sets: FxHashMap<GateId, Vec<GateId>>,
    in_sets: FxHashMap<GateId, Vec<GateId>>,
}

impl Neighbourhoods {
    fn new(width: usize) -> Self {
        Self {
            width,
            sets: FxHashMap::default(),
            in_sets: FxHashMap::default(),
        }
    }

    /// Recompute the neighbourhood of `g` and return its size.
    fn record(&mut self, dag: &CircuitDag, g: GateId) -> usize {
        let set = neighbourhood(dag, g, self.width);
        for &m in &set {
            let holders = self.in_sets.entry(m).or_default();
            if !holders.contains(&g) {
                holders.push(g);
            }
        }
        let size = set.len();
        self.sets.insert(g, set);
        size
    }

    fn size(&self, g: GateId) -> usize {
        self.sets.get(&g).map_or(0, Vec::len)
    }

    /// Gates whose neighbourhood contains any of `members`.
    fn holders(&self, members: &[GateId]) -> Vec<GateId> {
        let mut out = Vec::new();
        for m in members {
            if let Some(holders) = self.in_sets.get(m) {
                out = union(&out, holders);
            }
        }
        out
    }
}

impl BlockMerge {
    /// Merge the neighbourhood of `c` into it. Returns the merged gate and
    /// the gates removed from the DAG.
    fn absorb(
        dag: &mut CircuitDag,
        c: GateId,
        members: &[GateId],
        max_attempts: usize,
        report: &mut BlockMergeReport,
    ) -> CompileResult<(GateId, Vec<GateId>)> {
        let mut merged = c;
        let mut absorbed = Vec::new();
        let mut queue: VecDeque<GateId> = members.iter().copied().filter(|&m| m != c).collect();
        let mut attempts = 0;
        let mut stalled = 0;
        while let Some(m) = queue.pop_front() {
            if attempts == max_attempts {
                report.capped_gates += 1;
                break;
            }
            attempts += 1;
            if !dag.contains(m) {
                continue;
            }
            match dag.merge_gate(merged, m)? {
                MergeOutcome::Merged(g) => {
                    trace!(into = g.index(), absorbed = m.index(), "block merge");
                    merged = g;
                    absorbed.push(m);
                    report.merges += 1;
                    stalled = 0;
                }
                MergeOutcome::Unchanged(_) => {
                    queue.push_back(m);
                    stalled += 1;
                    if stalled >= queue.len() {
                        break;
                    }
                }
            }
        }
        Ok((merged, absorbed))
    }
}

impl Pass for BlockMerge {
    fn name(&self) -> &'static str {
        "block_merge"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let Some(width) = properties.config.block_width else {
            return Err(CompileError::InvalidConfiguration(
                "block merge needs a block width".into(),
            ));
        };
        let max_attempts = properties.config.max_merge_attempts;
        if dag.op_tab().iter().any(|&g| window(dag, g).is_none()) {
            return Err(CompileError::Unscheduled);
        }

        let mut hoods = Neighbourhoods::new(width);
        let mut queue: Vec<GateId> = Vec::new();
        for g in dag.op_tab().to_vec() {
            if hoods.record(dag, g) > 1 {
                queue.push(g);
            }
        }

        let mut report = BlockMergeReport::default();
        while !queue.is_empty() {
            report.rounds += 1;
            let mut pick = 0;
            for (i, g) in queue.iter().enumerate() {
                if hoods.size(*g) > hoods.size(queue[pick]) {
                    pick = i;
                }
            }
            let c = queue.remove(pick);
            if !dag.contains(c) {
                continue;
            }

            let members = neighbourhood(dag, c, width);
            let to_update = hoods.holders(&members);
            let (merged, absorbed) = Self::absorb(dag, c, &members, max_attempts, &mut report)?;
            if absorbed.is_empty() {
                continue;
            }

            queue.retain(|g| !absorbed.contains(g));
            if hoods.record(dag, merged) > 1 {
                queue.push(merged);
            }
            for g in to_update {
                if g == merged || g == c || !dag.contains(g) {
                    continue;
                }
                if hoods.record(dag, g) <= 1 {
                    queue.retain(|&q| q != g);
                }
            }
        }
        properties.schedule = None;

        debug!(
            width,
            merges = report.merges,
            rounds = report.rounds,
            capped = report.capped_gates,
            "block merge complete"
        );
        properties.insert(report);
        Ok(())
    }

    fn should_run(&self, dag: &CircuitDag, properties: &PropertySet) -> bool {
        properties.config.block_width.is_some() && dag.num_gates() > 1
    }
}
