//! Aggregated gates: the unit of merging and scheduling.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::AtomicOp;
use crate::qubit::QubitId;
use crate::unitary::{Matrix, circuit_unitary};

/// Per-wire chaining of a gate's own operations.
///
/// Replays the operations in order with the same rule the circuit DAG uses:
/// the op after the current tail of each of its wires. Each op gets a layer
/// (1-based) and an as-soon-as-possible start time relative to the gate's
/// own start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCircuit {
    wires: Vec<QubitId>,
    chains: FxHashMap<QubitId, Vec<usize>>,
    layer: Vec<usize>,
    start: Vec<f64>,
    makespan: f64,
}

impl SubCircuit {
    fn build(wires: &[QubitId], ops: &[AtomicOp]) -> Self {
        let mut chains: FxHashMap<QubitId, Vec<usize>> =
            wires.iter().map(|&w| (w, Vec::new())).collect();
        let mut layer = Vec::with_capacity(ops.len());
        let mut start = Vec::with_capacity(ops.len());
        let mut makespan: f64 = 0.0;

        for (idx, op) in ops.iter().enumerate() {
            let mut op_layer = 1;
            let mut op_start: f64 = 0.0;
            for q in op.qubits() {
                let chain = chains.entry(*q).or_default();
                if let Some(&tail) = chain.last() {
                    op_layer = op_layer.max(layer[tail] + 1);
                    op_start = op_start.max(start[tail] + ops[tail].duration());
                }
                chain.push(idx);
            }
            layer.push(op_layer);
            start.push(op_start);
            makespan = makespan.max(op_start + op.duration());
        }

        Self {
            wires: wires.to_vec(),
            chains,
            layer,
            start,
            makespan,
        }
    }

    /// Wires in first-touch order.
    pub fn wires(&self) -> &[QubitId] {
        &self.wires
    }

    /// Indices of the ops on `wire`, in order.
    pub fn chain(&self, wire: QubitId) -> &[usize] {
        self.chains.get(&wire).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Layer of an op (1-based).
    pub fn layer(&self, op: usize) -> Option<usize> {
        self.layer.get(op).copied()
    }

    /// Number of layers.
    pub fn depth(&self) -> usize {
        self.layer.iter().copied().max().unwrap_or(0)
    }

    /// Start time of an op relative to the gate start.
    pub fn start_time(&self, op: usize) -> Option<f64> {
        self.start.get(op).copied()
    }

    /// Latest op finish time.
    pub fn makespan(&self) -> f64 {
        self.makespan
    }

    /// The op directly before `op` on `wire`.
    pub fn predecessor_on(&self, op: usize, wire: QubitId) -> Option<usize> {
        let chain = self.chain(wire);
        let pos = chain.iter().position(|&o| o == op)?;
        pos.checked_sub(1).map(|p| chain[p])
    }

    /// The op directly after `op` on `wire`.
    pub fn successor_on(&self, op: usize, wire: QubitId) -> Option<usize> {
        let chain = self.chain(wire);
        let pos = chain.iter().position(|&o| o == op)?;
        chain.get(pos + 1).copied()
    }
}

/// A DAG node: one or more atomic operations fused into a single unit.
///
/// Identity lives in the DAG handle, not here; two aggregated gates with the
/// same operations are still distinct nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedGate {
    ops: Vec<AtomicOp>,
    qubits: Vec<QubitId>,
    sub: SubCircuit,
    fences: FxHashMap<QubitId, (usize, usize)>,
    start: Option<f64>,
}

impl AggregatedGate {
    /// Build from a non-empty list of operations.
    pub fn new(ops: Vec<AtomicOp>) -> IrResult<Self> {
        if ops.is_empty() {
            return Err(IrError::EmptyGate);
        }
        let mut qubits = Vec::new();
        for op in &ops {
            for q in op.qubits() {
                if !qubits.contains(q) {
                    qubits.push(*q);
                }
            }
        }
        let sub = SubCircuit::build(&qubits, &ops);
        let fences = qubits
            .iter()
            .filter_map(|&q| {
                let chain = sub.chain(q);
                Some((q, (*chain.first()?, *chain.last()?)))
            })
            .collect();
        Ok(Self {
            ops,
            qubits,
            sub,
            fences,
            start: None,
        })
    }

    /// Wrap a single operation.
    pub fn single(op: AtomicOp) -> Self {
        let qubits = op.qubits().to_vec();
        let ops = vec![op];
        let sub = SubCircuit::build(&qubits, &ops);
        let fences = qubits.iter().map(|&q| (q, (0, 0))).collect();
        Self {
            ops,
            qubits,
            sub,
            fences,
            start: None,
        }
    }

    /// Fuse two gates: all of `pred`'s operations, then all of `succ`'s.
    ///
    /// On every shared wire, `pred`'s last fence op ends up directly before
    /// `succ`'s first fence op in the new sub-circuit. The result inherits
    /// `pred`'s start time.
    pub fn concat(pred: &Self, succ: &Self) -> Self {
        let ops: Vec<AtomicOp> = pred.ops.iter().chain(&succ.ops).cloned().collect();
        let mut qubits = pred.qubits.clone();
        for q in &succ.qubits {
            if !qubits.contains(q) {
                qubits.push(*q);
            }
        }
        let sub = SubCircuit::build(&qubits, &ops);
        let offset = pred.ops.len();
        let fences = qubits
            .iter()
            .map(|&q| {
                let first = pred
                    .fence(q)
                    .map(|(f, _)| f)
                    .or_else(|| succ.fence(q).map(|(f, _)| f + offset));
                let last = succ
                    .fence(q)
                    .map(|(_, l)| l + offset)
                    .or_else(|| pred.fence(q).map(|(_, l)| l));
                (q, (first.unwrap_or(0), last.unwrap_or(0)))
            })
            .collect();
        Self {
            ops,
            qubits,
            sub,
            fences,
            start: pred.start,
        }
    }

    /// The atomic operations, in execution order.
    #[inline]
    pub fn ops(&self) -> &[AtomicOp] {
        &self.ops
    }

    /// Wires touched, first-touch order.
    #[inline]
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Number of wires touched.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Check whether the gate touches `qubit`.
    #[inline]
    pub fn acts_on(&self, qubit: QubitId) -> bool {
        self.qubits.contains(&qubit)
    }

    /// The gate wraps exactly one operation.
    #[inline]
    pub fn is_single_op(&self) -> bool {
        self.ops.len() == 1
    }

    /// The first operation.
    #[inline]
    pub fn first_op(&self) -> &AtomicOp {
        // `new` rejects empty op lists and `single`/`concat` never build one.
        &self.ops[0]
    }

    /// Duration: the private sub-circuit's makespan.
    #[inline]
    pub fn duration(&self) -> f64 {
        self.sub.makespan()
    }

    /// (first, last) sub-circuit op index touching `qubit`.
    pub fn fence(&self, qubit: QubitId) -> Option<(usize, usize)> {
        self.fences.get(&qubit).copied()
    }

    /// The private sub-circuit.
    pub fn sub_circuit(&self) -> &SubCircuit {
        &self.sub
    }

    /// Scheduled start time, once assigned.
    #[inline]
    pub fn start_time(&self) -> Option<f64> {
        self.start
    }

    /// Scheduled finish time, once a start is assigned.
    #[inline]
    pub fn finish_time(&self) -> Option<f64> {
        self.start.map(|s| s + self.duration())
    }

    pub(crate) fn set_start_time(&mut self, start: Option<f64>) {
        self.start = start;
    }

    /// Local unitary over [`qubits`](Self::qubits), `None` if an op has none.
    pub fn unitary(&self) -> Option<Matrix> {
        circuit_unitary(&self.qubits, &self.ops)
    }

    /// Op names joined by `+`, for logs and graph labels.
    pub fn label(&self) -> String {
        self.ops
            .iter()
            .map(AtomicOp::name)
            .collect::<Vec<_>>()
            .join("+")
    }
}
