//! Scheduled-output writer.
//!
//! The format lists the wires, then one line per atomic operation:
//!
//! ```text
//! qubit a
//! qubit b
//! 0.0 H a
//! 1.0 CNOT a,b
//! 3.0 Rz 0.25 b
//! ```
//!
//! Every operation of a fused gate carries the gate's start time.

use std::io;

use qoc_ir::{AtomicOp, CircuitDag};

use crate::error::CompileResult;
use crate::passes::Schedule;

/// Render a time or angle with at least one decimal digit.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn format_op(dag: &CircuitDag, start: f64, op: &AtomicOp) -> String {
    let wires: Vec<&str> = op
        .qubits()
        .iter()
        .map(|&q| dag.qubit_name(q).unwrap_or("?"))
        .collect();
    match op.rotation() {
        Some(theta) => format!(
            "{} {} {} {}",
            format_value(start),
            op.name(),
            format_value(theta),
            wires.join(",")
        ),
        None => format!("{} {} {}", format_value(start), op.name(), wires.join(",")),
    }
}

/// Render the schedule in entry order.
pub fn render_schedule(dag: &CircuitDag, schedule: &Schedule) -> String {
    let mut out = String::new();
    for qubit in dag.qubits() {
        out.push_str("qubit ");
        out.push_str(&qubit.name);
        out.push('\n');
    }
    for &(g, start) in &schedule.entries {
        let Some(gate) = dag.gate(g) else {
            continue;
        };
        for op in gate.ops() {
            out.push_str(&format_op(dag, start, op));
            out.push('\n');
        }
    }
    out
}

/// Write the schedule stamped on the DAG to `writer`.
///
/// Fails with [`CompileError::Unscheduled`](crate::CompileError::Unscheduled)
/// if any gate lacks a start time.
pub fn write_schedule<W: io::Write>(dag: &CircuitDag, writer: &mut W) -> CompileResult<()> {
    let schedule = Schedule::from_dag(dag)?;
    writer.write_all(render_schedule(dag, &schedule).as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::scheduling::schedule;
    use qoc_ir::{GateDurations, StandardGate};

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(3.0), "3.0");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(-1.5), "-1.5");
    }

    #[test]
    fn test_write_schedule() {
        let durations = GateDurations::uniform(1.0).with("CNOT", 2.0).unwrap();
        let mut dag = CircuitDag::new(durations);
        let a = dag.add_qubit("a").unwrap();
        let b = dag.add_qubit("b").unwrap();
        dag.push_op(StandardGate::H, &[a]).unwrap();
        dag.push_op(StandardGate::Cnot, &[a, b]).unwrap();
        dag.push_op(StandardGate::Rz(0.25), &[b]).unwrap();
        dag.detect_commutation();
        schedule(&mut dag).unwrap();

        let mut buf = Vec::new();
        write_schedule(&dag, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "qubit a\nqubit b\n0.0 H a\n1.0 CNOT a,b\n3.0 Rz 0.25 b\n"
        );
    }

    #[test]
    fn test_fused_gate_lists_each_op_at_its_start() {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        let (q0, q1) = (qoc_ir::QubitId(0), qoc_ir::QubitId(1));
        let first = dag.push_op(StandardGate::Cz, &[q0, q1]).unwrap();
        let second = dag.push_op(StandardGate::Cz, &[q0, q1]).unwrap();
        dag.push_op(StandardGate::X, &[q1]).unwrap();
        dag.detect_commutation();
        assert!(dag.merge_gate(first, second).unwrap().is_merged());
        dag.detect_commutation();
        let sched = schedule(&mut dag).unwrap();

        assert_eq!(
            render_schedule(&dag, &sched),
            "qubit q0\nqubit q1\n0.0 CZ q0,q1\n0.0 CZ q0,q1\n2.0 X q1\n"
        );
    }

    #[test]
    fn test_unscheduled_dag_is_rejected() {
        let mut dag = CircuitDag::with_qubits(1, GateDurations::uniform(1.0));
        dag.push_op(StandardGate::X, &[qoc_ir::QubitId(0)]).unwrap();
        let mut buf = Vec::new();
        assert!(write_schedule(&dag, &mut buf).is_err());
    }
}
