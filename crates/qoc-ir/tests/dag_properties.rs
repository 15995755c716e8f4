//! Property-based tests for commutation analysis and gate merging.
//!
//! Random circuits are analysed, then fused pairwise; the DAG has to stay
//! well-formed and the circuit unitary has to stay the same.

use proptest::prelude::*;
use qoc_ir::unitary::{allclose, circuit_unitary};
use qoc_ir::{AtomicOp, CircuitDag, GateDurations, GateId, Matrix, QubitId, StandardGate};

/// Gate operations a random circuit is built from.
#[derive(Debug, Clone)]
enum GateOp {
    One(StandardGate, u32),
    Two(StandardGate, u32, u32),
}

fn arb_one_qubit_gate() -> impl Strategy<Value = StandardGate> {
    prop_oneof![
        Just(StandardGate::H),
        Just(StandardGate::X),
        Just(StandardGate::Y),
        Just(StandardGate::Z),
        Just(StandardGate::S),
        Just(StandardGate::T),
        Just(StandardGate::Tdag),
        (-3.0_f64..3.0).prop_map(StandardGate::Rz),
        (-3.0_f64..3.0).prop_map(StandardGate::Rx),
    ]
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let two = (
        prop_oneof![
            Just(StandardGate::Cnot),
            Just(StandardGate::Cz),
            Just(StandardGate::Swap)
        ],
        0..num_qubits,
        1..num_qubits.max(2),
    )
        .prop_map(move |(g, a, offset)| GateOp::Two(g, a, (a + offset) % num_qubits.max(2)));
    if num_qubits < 2 {
        (arb_one_qubit_gate(), 0..num_qubits)
            .prop_map(|(g, q)| GateOp::One(g, q))
            .boxed()
    } else {
        prop_oneof![
            (arb_one_qubit_gate(), 0..num_qubits).prop_map(|(g, q)| GateOp::One(g, q)),
            two,
        ]
        .boxed()
    }
}

fn arb_circuit() -> impl Strategy<Value = (u32, Vec<GateOp>)> {
    (1_u32..=4).prop_flat_map(|n| (Just(n), prop::collection::vec(arb_gate_op(n), 1..=14)))
}

fn build(num_qubits: u32, ops: &[GateOp]) -> (CircuitDag, Vec<AtomicOp>) {
    let mut dag = CircuitDag::with_qubits(num_qubits, GateDurations::uniform(1.0));
    let mut program = Vec::new();
    for op in ops {
        let (gate, wires) = match *op {
            GateOp::One(g, q) => (g, vec![QubitId(q)]),
            GateOp::Two(g, a, b) => (g, vec![QubitId(a), QubitId(b)]),
        };
        let id = dag.push_op(gate, &wires).unwrap();
        program.push(dag.gate(id).unwrap().first_op().clone());
    }
    (dag, program)
}

fn dag_unitary(dag: &CircuitDag) -> Matrix {
    let wires: Vec<QubitId> = dag.qubit_ids().collect();
    let order = dag.chain_order().unwrap();
    let ops: Vec<&AtomicOp> = order
        .iter()
        .flat_map(|&g| dag.gate(g).unwrap().ops())
        .collect();
    circuit_unitary(&wires, ops).unwrap()
}

/// Pairs that are neighbours in the chain of every wire they share.
fn consecutive_pairs(dag: &CircuitDag) -> Vec<(GateId, GateId)> {
    let mut pairs = Vec::new();
    for q in dag.qubit_ids() {
        for pair in dag.chain(q).windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let ga = dag.gate(a).unwrap();
            let gb = dag.gate(b).unwrap();
            let tight = ga.qubits().iter().filter(|&&w| gb.acts_on(w)).all(|&w| {
                let chain = dag.chain(w);
                let pa = chain.iter().position(|&g| g == a).unwrap();
                chain.get(pa + 1) == Some(&b)
            });
            if tight && !pairs.contains(&(a, b)) {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Analysis leaves a well-formed DAG with symmetric peer sets.
    #[test]
    fn analysis_is_well_formed((n, ops) in arb_circuit()) {
        let (mut dag, _) = build(n, &ops);
        dag.detect_commutation();
        prop_assert!(dag.verify_integrity().is_ok());

        for &g in dag.op_tab() {
            for &peer in dag.com_set(g) {
                prop_assert!(dag.com_set(peer).contains(&g));
            }
        }
    }

    /// A block boundary means the opener does not commute with the gate
    /// right before it.
    #[test]
    fn block_boundaries_do_not_commute((n, ops) in arb_circuit()) {
        let (mut dag, _) = build(n, &ops);
        dag.detect_commutation();
        for q in dag.qubit_ids() {
            for pair in dag.blocks(q).windows(2) {
                let last = *pair[0].last().unwrap();
                let first = pair[1][0];
                prop_assert!(!dag.gates_commute(last, first));
            }
            for block in dag.blocks(q) {
                for pair in block.windows(2) {
                    prop_assert!(dag.gates_commute(pair[0], pair[1]));
                }
            }
        }
    }

    /// Fusing neighbours keeps the DAG well-formed and the unitary intact.
    #[test]
    fn merges_preserve_semantics(
        (n, ops) in arb_circuit(),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let (mut dag, program) = build(n, &ops);
        let wires: Vec<QubitId> = dag.qubit_ids().collect();
        let expected = circuit_unitary(&wires, &program).unwrap();
        dag.detect_commutation();

        for pick in picks {
            let pairs = consecutive_pairs(&dag);
            if pairs.is_empty() {
                break;
            }
            let (a, b) = pairs[pick.index(pairs.len())];
            let before = dag.num_gates();
            let outcome = dag.merge_gate(a, b).unwrap();
            if outcome.is_merged() {
                prop_assert_eq!(dag.num_gates(), before - 1);
            } else {
                prop_assert_eq!(dag.num_gates(), before);
            }
            prop_assert!(dag.verify_integrity().is_ok());
        }

        prop_assert_eq!(dag.num_ops(), program.len());
        prop_assert!(allclose(&dag_unitary(&dag), &expected, 1e-8, 1e-6));
    }
}
