//! Check command implementation.

use anyhow::Result;
use console::style;

use super::common::{load_circuit, load_durations};

/// Parse the input files and build the DAG without optimizing it.
pub fn execute(input: &str, durations: Option<&str>) -> Result<()> {
    let circuit = load_circuit(input)?;
    let durations = load_durations(durations)?;
    let mut dag = circuit.into_dag(durations)?;
    dag.detect_commutation();
    dag.verify_integrity()?;

    let blocks: usize = dag.qubit_ids().map(|q| dag.blocks(q).len()).sum();
    println!("{} {} is valid", style("✓").green().bold(), style(input).green());
    println!(
        "  {} qubits, {} gates, {} commutation blocks",
        dag.num_qubits(),
        dag.num_gates(),
        blocks
    );
    Ok(())
}
