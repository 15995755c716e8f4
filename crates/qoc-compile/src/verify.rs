//! Numerical equivalence check between a source gate sequence and a
//! compiled DAG.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use qoc_ir::unitary::{Matrix, circuit_unitary};
use qoc_ir::{AtomicOp, CircuitDag, QubitId};

use crate::error::{CompileError, CompileResult};

/// Dense unitaries grow as 4^n; refuse anything wider.
pub const MAX_VERIFY_QUBITS: usize = 12;

/// Entrywise tolerance of the comparison.
pub const VERIFY_ATOL: f64 = 1e-6;

/// Result of [`verify_unitary`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnitaryCheck {
    /// Both unitaries agree within [`VERIFY_ATOL`].
    pub equivalent: bool,
    /// They agree once a global phase is divided out.
    pub equivalent_up_to_phase: bool,
    /// Largest entrywise deviation, before phase correction.
    pub max_deviation: f64,
    /// The compiled unitary satisfies `U^H U = I`.
    pub is_unitary: bool,
}

fn max_deviation(a: &Matrix, b: &Matrix) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

fn is_unitary(m: &Matrix) -> bool {
    let adjoint = m.t().mapv(|z| z.conj());
    let product = adjoint.dot(m);
    let identity: Array2<Complex64> = Array2::eye(m.nrows());
    max_deviation(&product, &identity) <= VERIFY_ATOL
}

/// `b` scaled by the phase that best aligns it with `a`, taken at `a`'s
/// largest entry.
fn align_phase(a: &Matrix, b: &Matrix) -> Matrix {
    let pivot = a
        .indexed_iter()
        .max_by(|x, y| x.1.norm().total_cmp(&y.1.norm()))
        .map(|(idx, _)| idx);
    match pivot {
        Some(idx) if b[idx].norm() > VERIFY_ATOL => {
            let phase = a[idx] / b[idx];
            let phase = phase / phase.norm();
            b.mapv(|z| z * phase)
        }
        _ => b.clone(),
    }
}

/// Compare the unitary of `original` with the unitary of the compiled DAG,
/// whose gates are replayed in wire-chain order.
///
/// Both are computed over all declared wires of `dag`. Fails if a wire
/// count exceeds [`MAX_VERIFY_QUBITS`] or an operation (`measure`) has no
/// unitary.
pub fn verify_unitary(original: &[AtomicOp], dag: &CircuitDag) -> CompileResult<UnitaryCheck> {
    let wires: Vec<QubitId> = dag.qubit_ids().collect();
    if wires.len() > MAX_VERIFY_QUBITS {
        return Err(CompileError::Unverifiable(format!(
            "{} qubits exceed the limit of {MAX_VERIFY_QUBITS}",
            wires.len()
        )));
    }
    let non_unitary = || CompileError::Unverifiable("circuit contains a non-unitary operation".into());

    let expected = circuit_unitary(&wires, original).ok_or_else(non_unitary)?;
    let order = dag.chain_order()?;
    let compiled_ops = order
        .iter()
        .filter_map(|&g| dag.gate(g))
        .flat_map(|gate| gate.ops());
    let actual = circuit_unitary(&wires, compiled_ops).ok_or_else(non_unitary)?;

    let deviation = max_deviation(&expected, &actual);
    let aligned = align_phase(&expected, &actual);
    let check = UnitaryCheck {
        equivalent: deviation <= VERIFY_ATOL,
        equivalent_up_to_phase: max_deviation(&expected, &aligned) <= VERIFY_ATOL,
        max_deviation: deviation,
        is_unitary: is_unitary(&actual),
    };
    debug!(
        equivalent = check.equivalent,
        deviation = check.max_deviation,
        "unitary verification"
    );
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qoc_ir::{GateDurations, StandardGate};

    fn build(ops: &[(StandardGate, &[u32])]) -> (Vec<AtomicOp>, CircuitDag) {
        let mut dag = CircuitDag::with_qubits(2, GateDurations::uniform(1.0));
        let mut program = Vec::new();
        for (g, qs) in ops {
            let qs: Vec<QubitId> = qs.iter().map(|&q| QubitId(q)).collect();
            program.push(dag.atomic_op(*g, qs.clone()).unwrap());
            dag.push_op(*g, &qs).unwrap();
        }
        (program, dag)
    }

    #[test]
    fn test_merged_dag_is_equivalent() {
        let (program, mut dag) = build(&[
            (StandardGate::H, &[0]),
            (StandardGate::Cnot, &[0, 1]),
            (StandardGate::T, &[1]),
        ]);
        dag.detect_commutation();
        let first = dag.op_tab()[0];
        let second = dag.op_tab()[1];
        dag.merge_gate(first, second).unwrap();

        let check = verify_unitary(&program, &dag).unwrap();
        assert!(check.equivalent);
        assert!(check.equivalent_up_to_phase);
        assert!(check.is_unitary);
    }

    #[test]
    fn test_dropped_gate_is_detected() {
        let (program, mut dag) = build(&[(StandardGate::H, &[0]), (StandardGate::X, &[1])]);
        let x = dag.op_tab()[1];
        dag.remove_gate(x).unwrap();

        let check = verify_unitary(&program, &dag).unwrap();
        assert!(!check.equivalent);
        assert!(!check.equivalent_up_to_phase);
        assert!(check.max_deviation > 0.5);
    }

    #[test]
    fn test_global_phase_is_tolerated() {
        // Rz(2pi) = -I.
        let (program, mut dag) = build(&[(StandardGate::Rz(std::f64::consts::TAU), &[0])]);
        let rz = dag.op_tab()[0];
        dag.remove_gate(rz).unwrap();

        let check = verify_unitary(&program, &dag).unwrap();
        assert!(!check.equivalent);
        assert!(check.equivalent_up_to_phase);
    }

    #[test]
    fn test_measurement_cannot_be_verified() {
        let (program, dag) = build(&[(StandardGate::Measure, &[0])]);
        assert!(matches!(
            verify_unitary(&program, &dag),
            Err(CompileError::Unverifiable(_))
        ));
    }
}
