//! Benchmarks for the optimization pipeline
//!
//! Run with: cargo bench -p qoc-compile

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use qoc_compile::passes::{CommutationAnalysis, ListScheduler};
use qoc_compile::{CompileConfig, Pass, PropertySet, compile};
use qoc_ir::{CircuitDag, GateDurations, QubitId, StandardGate};

/// Rz layer, CNOT ladder, Rx layer, repeated.
fn ladder_dag(num_qubits: u32, layers: usize) -> CircuitDag {
    let durations = GateDurations::uniform(1.0).with("CNOT", 2.0).unwrap();
    let mut dag = CircuitDag::with_qubits(num_qubits, durations);
    for layer in 0..layers {
        for i in 0..num_qubits {
            let theta = 0.1 * f64::from(i + 1) + layer as f64;
            dag.push_op(StandardGate::Rz(theta), &[QubitId(i)]).unwrap();
        }
        for i in 0..num_qubits - 1 {
            dag.push_op(StandardGate::Cnot, &[QubitId(i), QubitId(i + 1)])
                .unwrap();
        }
        for i in 0..num_qubits {
            dag.push_op(StandardGate::Rx(0.2), &[QubitId(i)]).unwrap();
        }
    }
    dag
}

/// Seeded random circuit over a small gate set.
fn random_dag(num_qubits: u32, num_gates: usize, seed: u64) -> CircuitDag {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dag = CircuitDag::with_qubits(num_qubits, GateDurations::uniform(1.0));
    for _ in 0..num_gates {
        let a = rng.gen_range(0..num_qubits);
        let pushed = match rng.gen_range(0..6) {
            0 => dag.push_op(StandardGate::H, &[QubitId(a)]),
            1 => dag.push_op(StandardGate::X, &[QubitId(a)]),
            2 => dag.push_op(StandardGate::Rz(rng.gen_range(-3.0..3.0)), &[QubitId(a)]),
            3 => dag.push_op(StandardGate::T, &[QubitId(a)]),
            _ => {
                let b = (a + rng.gen_range(1..num_qubits)) % num_qubits;
                let gate = if rng.gen_bool(0.5) {
                    StandardGate::Cnot
                } else {
                    StandardGate::Cz
                };
                dag.push_op(gate, &[QubitId(a), QubitId(b)])
            }
        };
        pushed.unwrap();
    }
    dag
}

/// Benchmark the scheduler alone
fn bench_list_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_scheduler");

    for num_qubits in &[4, 8, 16] {
        let mut dag = ladder_dag(*num_qubits, 8);
        CommutationAnalysis
            .run(&mut dag, &mut PropertySet::new())
            .unwrap();
        group.bench_with_input(BenchmarkId::new("ladder", num_qubits), &dag, |b, dag| {
            b.iter(|| {
                let mut dag = dag.clone();
                let mut props = PropertySet::new();
                ListScheduler::new().run(&mut dag, &mut props).unwrap();
                black_box(props.schedule)
            });
        });
    }

    group.finish();
}

/// Benchmark the full pipeline at different block widths
fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    group.sample_size(20);

    for width in &[2, 3, 4] {
        let dag = ladder_dag(6, 6);
        group.bench_with_input(BenchmarkId::new("width", width), &dag, |b, dag| {
            b.iter(|| {
                let mut dag = dag.clone();
                let config = CompileConfig::default().with_block_width(*width);
                black_box(compile(&mut dag, config).unwrap())
            });
        });
    }

    group.finish();
}

/// Benchmark the full pipeline on random circuits
fn bench_random_circuits(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_circuits");
    group.sample_size(20);

    for num_gates in &[50, 100, 200] {
        let dag = random_dag(5, *num_gates, 7);
        group.bench_with_input(BenchmarkId::new("gates", num_gates), &dag, |b, dag| {
            b.iter(|| {
                let mut dag = dag.clone();
                let config = CompileConfig::default().with_block_width(3);
                black_box(compile(&mut dag, config).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_list_scheduler,
    bench_full_pipeline,
    bench_random_circuits,
);

criterion_main!(benches);
