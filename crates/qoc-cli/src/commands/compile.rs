//! Compile command implementation.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use qoc_compile::{BlockMergeReport, CancellationReport, DiagonalMergeReport, verify_unitary};
use qoc_ir::AtomicOp;

use super::common::{default_output, load_circuit, load_config, load_durations};

/// Options of the compile command.
pub struct CompileOptions<'a> {
    pub input: &'a str,
    pub durations: Option<&'a str>,
    pub config: Option<&'a str>,
    pub block_width: Option<usize>,
    pub no_cancel: bool,
    pub output: Option<&'a str>,
    pub dot: Option<&'a str>,
    pub verify: bool,
}

/// Execute the compile command.
pub fn execute(opts: &CompileOptions<'_>) -> Result<()> {
    println!(
        "{} Compiling {}",
        style("→").cyan().bold(),
        style(opts.input).green()
    );

    let circuit = load_circuit(opts.input)?;
    let durations = load_durations(opts.durations)?;
    let config = load_config(opts.config, opts.block_width, opts.no_cancel)?;
    println!(
        "  Loaded: {} qubits, {} gates",
        circuit.num_qubits(),
        circuit.num_gates()
    );

    let mut dag = circuit.into_dag(durations)?;
    let program: Vec<AtomicOp> = if opts.verify {
        dag.op_tab()
            .iter()
            .filter_map(|&g| dag.gate(g))
            .flat_map(|gate| gate.ops().iter().cloned())
            .collect()
    } else {
        Vec::new()
    };

    let width = config
        .block_width
        .map_or_else(|| "unbounded".to_string(), |w| w.to_string());
    println!("  Running pipeline (block width {width})");
    let props = qoc_compile::compile(&mut dag, config)?;

    println!("{} Compilation complete", style("✓").green().bold());
    if let Some(report) = props.get::<CancellationReport>() {
        println!(
            "  Cancellation: {} removed, {} rotation groups fused",
            report.removed, report.fused
        );
    }
    if let Some(report) = props.get::<DiagonalMergeReport>() {
        println!(
            "  Diagonal merge: {} groups, {} gates fused",
            report.groups, report.gates_fused
        );
    }
    if let Some(report) = props.get::<BlockMergeReport>() {
        println!(
            "  Block merge: {} merges in {} rounds",
            report.merges, report.rounds
        );
        if report.capped_gates > 0 {
            println!(
                "  {} {} gates hit the merge attempt cap",
                style("!").yellow().bold(),
                report.capped_gates
            );
        }
    }
    let makespan = props.schedule.as_ref().map_or(0.0, |s| s.makespan);
    println!(
        "  Result: {} gates, {} ops, makespan {}",
        dag.num_gates(),
        dag.num_ops(),
        makespan
    );

    let output_path = opts
        .output
        .map_or_else(|| default_output(opts.input, "_scheduled.txt"), str::to_string);
    let file =
        File::create(&output_path).with_context(|| format!("Failed to create {output_path}"))?;
    let mut writer = BufWriter::new(file);
    qoc_compile::write_schedule(&dag, &mut writer)?;
    writer.flush()?;
    println!("  Output: {}", style(&output_path).green());
    info!(path = %output_path, "schedule written");

    if let Some(dot_path) = opts.dot {
        fs::write(dot_path, dag.to_dot())
            .with_context(|| format!("Failed to write {dot_path}"))?;
        println!("  Graph:  {}", style(dot_path).green());
    }

    if opts.verify {
        let check = verify_unitary(&program, &dag)?;
        if check.equivalent {
            println!("{} Unitary preserved", style("✓").green().bold());
        } else if check.equivalent_up_to_phase {
            println!(
                "{} Unitary preserved up to a global phase",
                style("✓").green().bold()
            );
        } else {
            anyhow::bail!(
                "compiled circuit differs from the input (max deviation {:.3e})",
                check.max_deviation
            );
        }
    }

    Ok(())
}
