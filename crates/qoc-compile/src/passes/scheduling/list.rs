//! Commutativity-aware list scheduling.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use qoc_ir::{CircuitDag, GateId, IrError, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

use super::TIME_EPSILON;

/// Start times for every gate of a DAG.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    /// Gates with their start time, in the order they were scheduled.
    pub entries: Vec<(GateId, f64)>,
    /// Start time by gate.
    pub execution_time: FxHashMap<GateId, f64>,
    /// Latest finish time.
    pub makespan: f64,
    /// Gates on a chain of back-to-back dependencies ending at the makespan.
    pub critical_path: Vec<GateId>,
    /// For every gate, the gates on back-to-back chains ending at its start.
    pub paths: FxHashMap<GateId, Vec<GateId>>,
}

impl Schedule {
    /// Start time of a gate.
    pub fn start_of(&self, id: GateId) -> Option<f64> {
        self.execution_time.get(&id).copied()
    }

    /// Number of scheduled gates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild a schedule from the start times stamped on the gates,
    /// ordered by start time and then by op-table position.
    ///
    /// Used when the DAG changed after the last scheduler run, as fused
    /// gates keep their predecessor's start time.
    pub fn from_dag(dag: &CircuitDag) -> CompileResult<Self> {
        let mut entries = Vec::with_capacity(dag.num_gates());
        for &g in dag.op_tab() {
            let start = dag
                .gate(g)
                .and_then(|gate| gate.start_time())
                .ok_or(CompileError::Unscheduled)?;
            entries.push((g, start));
        }
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        let sched = Self {
            execution_time: entries.iter().copied().collect(),
            entries,
            ..Self::default()
        };
        Ok(sched.with_critical_paths(dag))
    }

    /// Fill in the makespan, the critical path and the per-gate paths.
    fn with_critical_paths(mut self, dag: &CircuitDag) -> Self {
        self.makespan = self
            .entries
            .iter()
            .filter_map(|&(g, t)| dag.gate(g).map(|gate| t + gate.duration()))
            .fold(0.0, f64::max);
        let mut critical = Vec::new();
        for &(g, t) in &self.entries {
            let finish = dag.gate(g).map_or(t, |gate| t + gate.duration());
            if (finish - self.makespan).abs() <= TIME_EPSILON && !critical.contains(&g) {
                critical.push(g);
            }
        }
        for g in critical.clone() {
            trace_back(dag, g, &mut critical);
        }
        self.critical_path = critical;
        for &(g, _) in &self.entries {
            let mut path = Vec::new();
            trace_back(dag, g, &mut path);
            self.paths.insert(g, path);
        }
        self
    }
}

/// Per-wire progress through the commutation blocks.
struct WireCursor {
    current: Vec<GateId>,
    pending: VecDeque<Vec<GateId>>,
    timepoint: f64,
}

impl WireCursor {
    fn new(blocks: &[Vec<GateId>]) -> Self {
        let mut cursor = Self {
            current: Vec::new(),
            pending: blocks.iter().cloned().collect(),
            timepoint: 0.0,
        };
        cursor.advance();
        cursor
    }

    /// Move to the next non-empty block once the current one is done.
    fn advance(&mut self) {
        while self.current.is_empty() {
            match self.pending.pop_front() {
                Some(block) => self.current = block,
                None => break,
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.current.is_empty() && self.pending.iter().all(Vec::is_empty)
    }
}

/// Schedule an analyzed DAG and stamp the start times on its gates.
///
/// Each wire walks its commutation blocks in order. A gate is ready once
/// every wire it touches has reached the block holding it. Each round takes
/// the earliest time at which some ready gate has all of its wires free,
/// and starts at that time a maximal set of those gates that share no wire.
pub fn schedule(dag: &mut CircuitDag) -> CompileResult<Schedule> {
    if !dag.is_analyzed() {
        return Err(IrError::NotAnalyzed.into());
    }
    let wires: Vec<QubitId> = dag.qubit_ids().collect();
    let index: FxHashMap<QubitId, usize> = wires.iter().enumerate().map(|(i, &w)| (w, i)).collect();
    let mut cursors: Vec<WireCursor> = wires.iter().map(|&w| WireCursor::new(dag.blocks(w))).collect();

    let mut sched = Schedule::default();
    let mut ready: Vec<GateId> = Vec::new();
    refresh_ready(dag, &wires, &index, &cursors, &mut ready);

    while !ready.is_empty() {
        let free_at = |g: GateId| -> f64 {
            dag.gate(g).map_or(f64::INFINITY, |gate| {
                gate.qubits()
                    .iter()
                    .filter_map(|w| index.get(w))
                    .map(|&i| cursors[i].timepoint)
                    .fold(0.0, f64::max)
            })
        };
        let next_et = ready.iter().map(|&g| free_at(g)).fold(f64::INFINITY, f64::min);

        // Greedy maximal matching on the wire conflict graph.
        let mut busy: FxHashSet<QubitId> = FxHashSet::default();
        let mut selected = Vec::new();
        for &g in &ready {
            if free_at(g) > next_et {
                continue;
            }
            let Some(gate) = dag.gate(g) else {
                continue;
            };
            if gate.qubits().iter().any(|w| busy.contains(w)) {
                continue;
            }
            busy.extend(gate.qubits().iter().copied());
            selected.push((g, gate.qubits().to_vec(), gate.duration()));
        }

        for (g, qubits, duration) in selected {
            dag.set_start_time(g, Some(next_et))?;
            sched.entries.push((g, next_et));
            sched.execution_time.insert(g, next_et);
            ready.retain(|&r| r != g);
            for w in qubits {
                if let Some(&i) = index.get(&w) {
                    cursors[i].current.retain(|&x| x != g);
                    cursors[i].timepoint = next_et + duration;
                }
            }
        }
        for cursor in &mut cursors {
            cursor.advance();
        }
        refresh_ready(dag, &wires, &index, &cursors, &mut ready);
    }

    if !cursors.iter().all(WireCursor::is_exhausted) {
        let pending: FxHashSet<GateId> = cursors
            .iter()
            .flat_map(|c| c.current.iter().chain(c.pending.iter().flatten()))
            .copied()
            .collect();
        return Err(CompileError::ScheduleStalled {
            pending: pending.len(),
            wires: cursors.iter().filter(|c| !c.is_exhausted()).count(),
        });
    }

    let sched = sched.with_critical_paths(dag);
    debug!(
        gates = sched.len(),
        makespan = sched.makespan,
        critical = sched.critical_path.len(),
        "schedule complete"
    );
    Ok(sched)
}

/// Add gates that became current on all their wires.
fn refresh_ready(
    dag: &CircuitDag,
    wires: &[QubitId],
    index: &FxHashMap<QubitId, usize>,
    cursors: &[WireCursor],
    ready: &mut Vec<GateId>,
) {
    for (i, _) in wires.iter().enumerate() {
        for &g in &cursors[i].current {
            if ready.contains(&g) {
                continue;
            }
            let Some(gate) = dag.gate(g) else {
                continue;
            };
            let current_everywhere = gate.qubits().iter().all(|w| {
                index
                    .get(w)
                    .is_some_and(|&j| cursors[j].current.contains(&g))
            });
            if current_everywhere {
                ready.push(g);
            }
        }
    }
}

/// Collect the gates that finish exactly when `from` starts, following
/// wire predecessors and block-mates backwards.
fn trace_back(dag: &CircuitDag, from: GateId, store: &mut Vec<GateId>) {
    let mut stack = vec![from];
    while let Some(g) = stack.pop() {
        let Some(gate) = dag.gate(g) else {
            continue;
        };
        let Some(start) = gate.start_time() else {
            continue;
        };
        for &w in gate.qubits() {
            let mates = dag
                .block_of(g, w)
                .and_then(|b| dag.blocks(w).get(b))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            for c in dag.preds(g, w).into_iter().chain(mates.iter().copied()) {
                if c == g || store.contains(&c) {
                    continue;
                }
                let meets = dag
                    .gate(c)
                    .and_then(|cg| cg.finish_time())
                    .is_some_and(|f| (f - start).abs() <= TIME_EPSILON);
                if meets {
                    store.push(c);
                    stack.push(c);
                }
            }
        }
    }
}

/// Pass wrapper around [`schedule`].
///
/// The pipeline runs it twice: once to give block merging its start times,
/// and once more at the end, which the `reschedule` setting can turn off.
pub struct ListScheduler {
    rescheduling: bool,
}

impl ListScheduler {
    /// A scheduler that always runs.
    pub fn new() -> Self {
        Self {
            rescheduling: false,
        }
    }

    /// A scheduler that only runs when rescheduling is enabled.
    pub fn rescheduling() -> Self {
        Self { rescheduling: true }
    }
}

impl Default for ListScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ListScheduler {
    fn name(&self) -> &'static str {
        if self.rescheduling {
            "reschedule"
        } else {
            "list_scheduler"
        }
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut CircuitDag, properties: &mut PropertySet) -> CompileResult<()> {
        let sched = schedule(dag)?;
        info!(
            gates = sched.len(),
            makespan = sched.makespan,
            "scheduled circuit"
        );
        properties.schedule = Some(sched);
        Ok(())
    }

    fn should_run(&self, _dag: &CircuitDag, properties: &PropertySet) -> bool {
        !self.rescheduling || properties.config.reschedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qoc_ir::{GateDurations, StandardGate};

    fn durations() -> GateDurations {
        GateDurations::uniform(1.0)
            .with("H", 2.0)
            .unwrap()
            .with("CNOT", 3.0)
            .unwrap()
    }

    fn analyzed(ops: &[(StandardGate, &[u32])], n: u32) -> (CircuitDag, Vec<GateId>) {
        let mut dag = CircuitDag::with_qubits(n, durations());
        let ids = ops
            .iter()
            .map(|(g, qs)| {
                let qs: Vec<QubitId> = qs.iter().map(|&q| QubitId(q)).collect();
                dag.push_op(*g, &qs).unwrap()
            })
            .collect();
        dag.detect_commutation();
        (dag, ids)
    }

    #[test]
    fn test_chain_runs_back_to_back() {
        let (mut dag, ids) = analyzed(&[(StandardGate::X, &[0]), (StandardGate::H, &[0])], 1);
        let sched = schedule(&mut dag).unwrap();

        assert_eq!(sched.start_of(ids[0]), Some(0.0));
        assert_eq!(sched.start_of(ids[1]), Some(1.0));
        assert!((sched.makespan - 3.0).abs() < 1e-12);
        assert_eq!(sched.critical_path, vec![ids[1], ids[0]]);
        assert_eq!(dag.gate(ids[1]).unwrap().start_time(), Some(1.0));
        assert_eq!(sched.paths[&ids[1]], vec![ids[0]]);
    }

    #[test]
    fn test_independent_wires_run_in_parallel() {
        let (mut dag, ids) = analyzed(&[(StandardGate::X, &[0]), (StandardGate::X, &[1])], 2);
        let sched = schedule(&mut dag).unwrap();
        assert_eq!(sched.start_of(ids[0]), Some(0.0));
        assert_eq!(sched.start_of(ids[1]), Some(0.0));
        assert_eq!(sched.critical_path.len(), 2);
    }

    #[test]
    fn test_commuting_gates_do_not_overlap() {
        // Both commute on wire 0, so either order is allowed, but not both at once.
        let (mut dag, ids) = analyzed(
            &[(StandardGate::Cnot, &[0, 1]), (StandardGate::Rz(0.5), &[0])],
            2,
        );
        let sched = schedule(&mut dag).unwrap();
        let cx = sched.start_of(ids[0]).unwrap();
        let rz = sched.start_of(ids[1]).unwrap();
        assert!(rz >= cx + 3.0 || cx >= rz + 1.0);
        assert_eq!(sched.len(), 2);
    }

    #[test]
    fn test_commutation_lets_short_gate_go_first() {
        // Rz commutes past the CNOT control; H on wire 1 holds the CNOT back.
        let (mut dag, ids) = analyzed(
            &[
                (StandardGate::H, &[1]),
                (StandardGate::Cnot, &[0, 1]),
                (StandardGate::Rz(0.1), &[0]),
            ],
            2,
        );
        let sched = schedule(&mut dag).unwrap();
        assert_eq!(sched.start_of(ids[0]), Some(0.0));
        assert_eq!(sched.start_of(ids[2]), Some(0.0));
        assert_eq!(sched.start_of(ids[1]), Some(2.0));
        assert!((sched.makespan - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_rebuilt_from_start_times() {
        let (mut dag, ids) = analyzed(
            &[
                (StandardGate::X, &[1]),
                (StandardGate::H, &[0]),
                (StandardGate::Cnot, &[0, 1]),
            ],
            2,
        );
        let sched = schedule(&mut dag).unwrap();
        let rebuilt = Schedule::from_dag(&dag).unwrap();

        assert_eq!(rebuilt.execution_time, sched.execution_time);
        assert_eq!(rebuilt.makespan, sched.makespan);
        assert_eq!(rebuilt.entries.last().map(|e| e.0), Some(ids[2]));
        assert!(rebuilt.critical_path.contains(&ids[1]));
    }

    #[test]
    fn test_requires_analysis() {
        let mut dag = CircuitDag::with_qubits(1, durations());
        dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
        assert!(matches!(
            schedule(&mut dag),
            Err(CompileError::Ir(IrError::NotAnalyzed))
        ));
    }

    #[test]
    fn test_empty_circuit() {
        let mut dag = CircuitDag::with_qubits(2, durations());
        dag.detect_commutation();
        let sched = schedule(&mut dag).unwrap();
        assert!(sched.is_empty());
        assert_eq!(sched.makespan, 0.0);
    }

    #[test]
    fn test_pass_stores_schedule() {
        let (mut dag, _) = analyzed(&[(StandardGate::X, &[0])], 1);
        let mut props = PropertySet::new();
        ListScheduler::new().run(&mut dag, &mut props).unwrap();
        assert_eq!(props.require_schedule().unwrap().len(), 1);

        props.config.reschedule = false;
        assert!(!ListScheduler::rescheduling().should_run(&dag, &props));
        assert!(ListScheduler::new().should_run(&dag, &props));
    }
}
