//! Tests for optimization passes.

use qoc_ir::{CircuitDag, GateDurations, QubitId, StandardGate};

use crate::config::CompileConfig;
use crate::pass::Pass;
use crate::property::PropertySet;

use super::{CancellationReport, DiagonalMerge, DiagonalMergeReport, SimpleCancellation};

fn dag(n: u32) -> CircuitDag {
    CircuitDag::with_qubits(n, GateDurations::uniform(1.0))
}

fn names(dag: &CircuitDag) -> Vec<String> {
    dag.op_tab()
        .iter()
        .map(|&g| dag.gate(g).unwrap().label())
        .collect()
}

fn cancel(dag: &mut CircuitDag) -> PropertySet {
    let mut props = PropertySet::new();
    dag.detect_commutation();
    SimpleCancellation.run(dag, &mut props).unwrap();
    props
}

#[test]
fn test_xx_cancels_to_empty() {
    let mut dag = dag(1);
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();

    let props = cancel(&mut dag);
    assert!(dag.is_empty());
    let report = props.get::<CancellationReport>().unwrap();
    assert_eq!(report.removed, 2);
    dag.verify_integrity().unwrap();
}

#[test]
fn test_odd_count_leaves_one() {
    let mut dag = dag(1);
    for _ in 0..3 {
        dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
    }
    cancel(&mut dag);
    assert_eq!(names(&dag), vec!["H"]);
}

#[test]
fn test_rotations_fuse() {
    let mut dag = dag(1);
    dag.push_op(StandardGate::Rz(0.3), &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::Rz(0.5), &[QubitId(0)]).unwrap();

    let props = cancel(&mut dag);
    assert_eq!(dag.num_gates(), 1);
    let op = dag.gate(dag.op_tab()[0]).unwrap().first_op().clone();
    assert_eq!(op.name(), "Rz");
    assert!((op.rotation().unwrap() - 0.8).abs() < 1e-12);
    assert_eq!(props.get::<CancellationReport>().unwrap().fused, 1);
}

#[test]
fn test_rotations_fuse_through_cnot_control() {
    let mut dag = dag(2);
    let (q0, q1) = (QubitId(0), QubitId(1));
    dag.push_op(StandardGate::Rz(0.3), &[q0]).unwrap();
    dag.push_op(StandardGate::Cnot, &[q0, q1]).unwrap();
    dag.push_op(StandardGate::Rz(0.5), &[q0]).unwrap();

    cancel(&mut dag);
    assert_eq!(names(&dag), vec!["Rz", "CNOT"]);
    let fused = dag.gate(dag.op_tab()[0]).unwrap();
    assert!((fused.first_op().rotation().unwrap() - 0.8).abs() < 1e-12);
    dag.verify_integrity().unwrap();
}

#[test]
fn test_non_commuting_gates_block_cancellation() {
    let mut dag = dag(1);
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();

    cancel(&mut dag);
    assert_eq!(names(&dag), vec!["X", "H", "X"]);
}

#[test]
fn test_cnot_pair_cancels() {
    let mut dag = dag(2);
    dag.push_op(StandardGate::Cnot, &[QubitId(0), QubitId(1)])
        .unwrap();
    dag.push_op(StandardGate::Cnot, &[QubitId(0), QubitId(1)])
        .unwrap();
    dag.push_op(StandardGate::H, &[QubitId(1)]).unwrap();

    cancel(&mut dag);
    assert_eq!(names(&dag), vec!["H"]);
    dag.verify_integrity().unwrap();
}

#[test]
fn test_cancellation_cascades() {
    // The inner X pair hides the outer H pair until it is gone.
    let mut dag = dag(1);
    dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::X, &[QubitId(0)]).unwrap();
    dag.push_op(StandardGate::H, &[QubitId(0)]).unwrap();

    let props = cancel(&mut dag);
    assert!(dag.is_empty());
    assert!(props.get::<CancellationReport>().unwrap().iterations >= 2);
}

#[test]
fn test_cancellation_can_be_disabled() {
    let dag = dag(1);
    let props = PropertySet::new().with_config(CompileConfig::default().with_cancellation(false));
    assert!(!SimpleCancellation.should_run(&dag, &props));
}

#[test]
fn test_cz_pair_fuses_diagonally() {
    let mut dag = dag(2);
    let (a, b) = (QubitId(0), QubitId(1));
    dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
    dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
    dag.detect_commutation();

    let mut props = PropertySet::new();
    DiagonalMerge.run(&mut dag, &mut props).unwrap();

    assert_eq!(dag.num_gates(), 1);
    let fused = dag.gate(dag.op_tab()[0]).unwrap();
    assert_eq!(fused.qubits(), &[a, b]);
    assert_eq!(fused.label(), "CZ+CZ");
    let report = props.get::<DiagonalMergeReport>().unwrap();
    assert_eq!(report.groups, 1);
    assert_eq!(report.gates_fused, 1);
    dag.verify_integrity().unwrap();
}

#[test]
fn test_commuting_rotations_join_diagonal_group() {
    let mut dag = dag(2);
    let (a, b) = (QubitId(0), QubitId(1));
    dag.push_op(StandardGate::Rz(0.2), &[a]).unwrap();
    dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
    dag.push_op(StandardGate::Rz(0.4), &[b]).unwrap();
    dag.detect_commutation();

    DiagonalMerge.run(&mut dag, &mut PropertySet::new()).unwrap();
    assert_eq!(dag.num_gates(), 1);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_phase_gates_stay_out_of_diagonal_groups() {
    let mut dag = dag(2);
    let (a, b) = (QubitId(0), QubitId(1));
    dag.push_op(StandardGate::T, &[a]).unwrap();
    dag.push_op(StandardGate::Cz, &[a, b]).unwrap();
    dag.detect_commutation();

    let mut props = PropertySet::new();
    DiagonalMerge.run(&mut dag, &mut props).unwrap();
    assert_eq!(dag.num_gates(), 2);
    assert_eq!(props.get::<DiagonalMergeReport>().unwrap().groups, 0);
}

#[test]
fn test_non_diagonal_gates_are_not_fused() {
    let mut dag = dag(2);
    let (a, b) = (QubitId(0), QubitId(1));
    dag.push_op(StandardGate::Cnot, &[a, b]).unwrap();
    dag.push_op(StandardGate::X, &[b]).unwrap();
    dag.detect_commutation();

    DiagonalMerge.run(&mut dag, &mut PropertySet::new()).unwrap();
    assert_eq!(dag.num_gates(), 2);
}

#[test]
fn test_diagonal_merge_skips_single_wire_circuits() {
    let mut dag = dag(1);
    dag.push_op(StandardGate::Rz(0.1), &[QubitId(0)]).unwrap();
    assert!(!DiagonalMerge.should_run(&dag, &PropertySet::new()));
}
