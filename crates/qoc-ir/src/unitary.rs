//! Dense unitaries of small gate groups.
//!
//! Used for commutation checks between neighbouring gates and for the
//! diagonality test of fusion candidates. Everything here is deterministic and
//! side-effect free. Matrices are indexed with the first wire of the supplied
//! wire list as the most significant bit.

use ndarray::{Array2, Zip, arr2};
use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use crate::gate::{AtomicOp, StandardGate};
use crate::qubit::QubitId;

/// Complex square matrix of dimension `2^n`.
pub type Matrix = Array2<Complex64>;

/// Absolute tolerance of the commutation check.
pub const COMMUTATION_ATOL: f64 = 1e-6;
/// Relative tolerance of the commutation check.
pub const COMMUTATION_RTOL: f64 = 1e-4;
/// Largest off-diagonal magnitude still treated as zero.
pub const DIAGONAL_ATOL: f64 = 1e-6;

#[inline]
fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Matrix of a single gate, or `None` for `measure`.
pub fn gate_matrix(gate: &StandardGate) -> Option<Matrix> {
    let zero = c(0.0, 0.0);
    let one = c(1.0, 0.0);
    let m = match *gate {
        StandardGate::H => {
            let h = c(FRAC_1_SQRT_2, 0.0);
            arr2(&[[h, h], [h, -h]])
        }
        StandardGate::X => arr2(&[[zero, one], [one, zero]]),
        StandardGate::Y => arr2(&[[zero, c(0.0, -1.0)], [c(0.0, 1.0), zero]]),
        StandardGate::Z => arr2(&[[one, zero], [zero, -one]]),
        StandardGate::S => arr2(&[[one, zero], [zero, c(0.0, 1.0)]]),
        StandardGate::T => arr2(&[[one, zero], [zero, Complex64::from_polar(1.0, FRAC_PI_4)]]),
        StandardGate::Tdag => arr2(&[
            [one, zero],
            [zero, Complex64::from_polar(1.0, -FRAC_PI_4)],
        ]),
        StandardGate::Rx(theta) => {
            let (s, co) = (theta / 2.0).sin_cos();
            arr2(&[[c(co, 0.0), c(0.0, -s)], [c(0.0, -s), c(co, 0.0)]])
        }
        StandardGate::Ry(theta) => {
            let (s, co) = (theta / 2.0).sin_cos();
            arr2(&[[c(co, 0.0), c(-s, 0.0)], [c(s, 0.0), c(co, 0.0)]])
        }
        StandardGate::Rz(theta) => arr2(&[
            [Complex64::from_polar(1.0, -theta / 2.0), zero],
            [zero, Complex64::from_polar(1.0, theta / 2.0)],
        ]),
        StandardGate::Cnot => arr2(&[
            [one, zero, zero, zero],
            [zero, one, zero, zero],
            [zero, zero, zero, one],
            [zero, zero, one, zero],
        ]),
        StandardGate::Cz => arr2(&[
            [one, zero, zero, zero],
            [zero, one, zero, zero],
            [zero, zero, one, zero],
            [zero, zero, zero, -one],
        ]),
        StandardGate::Swap => arr2(&[
            [one, zero, zero, zero],
            [zero, zero, one, zero],
            [zero, one, zero, zero],
            [zero, zero, zero, one],
        ]),
        StandardGate::Measure => return None,
    };
    Some(m)
}

/// Sub-index of basis state `r` restricted to the bits in `masks`.
fn sub_index(r: usize, masks: &[usize]) -> usize {
    masks
        .iter()
        .fold(0, |acc, &m| (acc << 1) | usize::from(r & m != 0))
}

/// Inverse of [`sub_index`]: scatter the bits of `t` onto `masks`.
fn scatter(t: usize, masks: &[usize]) -> usize {
    let k = masks.len();
    masks
        .iter()
        .enumerate()
        .filter(|(j, _)| (t >> (k - 1 - j)) & 1 == 1)
        .fold(0, |acc, (_, &m)| acc | m)
}

/// Left-multiply `acc` by `gate` embedded on the wires at `positions`.
fn apply_embedded(acc: &Matrix, gate: &Matrix, positions: &[usize], n: usize) -> Matrix {
    let dim = acc.nrows();
    let masks: Vec<usize> = positions.iter().map(|&p| 1usize << (n - 1 - p)).collect();
    let touched = masks.iter().fold(0, |m, b| m | b);
    let width = 1usize << masks.len();

    let mut out = Matrix::zeros((dim, dim));
    for r in 0..dim {
        let row = sub_index(r, &masks);
        let base = r & !touched;
        for t in 0..width {
            let coeff = gate[[row, t]];
            if coeff.norm_sqr() == 0.0 {
                continue;
            }
            let s = base | scatter(t, &masks);
            out.row_mut(r).scaled_add(coeff, &acc.row(s));
        }
    }
    out
}

/// Unitary of `ops` applied in order on `wires`.
///
/// Returns `None` if any op has no unitary or touches a wire outside `wires`.
pub fn circuit_unitary<'a, I>(wires: &[QubitId], ops: I) -> Option<Matrix>
where
    I: IntoIterator<Item = &'a AtomicOp>,
{
    let n = wires.len();
    let mut acc = Matrix::eye(1usize << n);
    for op in ops {
        let gate = gate_matrix(op.gate())?;
        let positions = op
            .qubits()
            .iter()
            .map(|q| wires.iter().position(|w| w == q))
            .collect::<Option<Vec<_>>>()?;
        acc = apply_embedded(&acc, &gate, &positions, n);
    }
    Some(acc)
}

/// Elementwise `|a - b| <= atol + rtol * |b|`.
pub fn allclose(a: &Matrix, b: &Matrix, atol: f64, rtol: f64) -> bool {
    a.dim() == b.dim() && Zip::from(a).and(b).all(|x, y| (x - y).norm() <= atol + rtol * y.norm())
}

/// All off-diagonal entries within `atol` of zero.
pub fn is_diagonal(m: &Matrix, atol: f64) -> bool {
    m.indexed_iter()
        .all(|((i, j), v)| i == j || v.norm() <= atol)
}

/// Union of the wires of two op lists, first-touch order.
pub fn wire_union<'a, I>(ops: I) -> Vec<QubitId>
where
    I: IntoIterator<Item = &'a AtomicOp>,
{
    let mut wires = Vec::new();
    for op in ops {
        for q in op.qubits() {
            if !wires.contains(q) {
                wires.push(*q);
            }
        }
    }
    wires
}

/// Check whether applying `a` then `b` equals applying `b` then `a`.
///
/// Groups on disjoint wires always commute. Groups containing a
/// non-unitary op never do.
pub fn ops_commute(a: &[AtomicOp], b: &[AtomicOp]) -> bool {
    let wires = wire_union(a.iter().chain(b));
    let a_wires = wire_union(a);
    if !b.iter().any(|op| op.qubits().iter().any(|q| a_wires.contains(q))) {
        return true;
    }
    let (Some(ab), Some(ba)) = (
        circuit_unitary(&wires, a.iter().chain(b)),
        circuit_unitary(&wires, b.iter().chain(a)),
    ) else {
        return false;
    };
    allclose(&ab, &ba, COMMUTATION_ATOL, COMMUTATION_RTOL)
}

/// Check whether the ops, applied in order, act diagonally.
pub fn ops_are_diagonal<'a, I>(ops: I) -> bool
where
    I: IntoIterator<Item = &'a AtomicOp> + Clone,
{
    let wires = wire_union(ops.clone());
    circuit_unitary(&wires, ops).is_some_and(|u| is_diagonal(&u, DIAGONAL_ATOL))
}
