//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - commutation-aware quantum circuit compiler",
        style("qoc").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qoc-ir       Circuit DAG, commutation analysis, gate merging");
    println!("  qoc-qasm     Circuit and gate-duration parsers");
    println!("  qoc-compile  Cancellation, diagonal merge, scheduling, block merge");
    println!("  qoc-cli      Command-line interface");
    println!();
    println!("License:    {}", style("Apache-2.0").dim());
}
