//! qoc Command-Line Interface
//!
//! Reads a circuit and a gate-duration table, runs the optimization
//! pipeline and writes the scheduled circuit.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::compile::CompileOptions;
use commands::{check, compile, version};

/// qoc - commutation-aware quantum circuit compiler
#[derive(Parser)]
#[command(name = "qoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize and schedule a circuit
    Compile {
        /// Circuit file
        #[arg(short, long)]
        input: String,

        /// Gate-duration file (every gate takes 1.0 if omitted)
        #[arg(short, long)]
        durations: Option<String>,

        /// Pipeline configuration (YAML or JSON)
        #[arg(short, long, env = "QOC_CONFIG")]
        config: Option<String>,

        /// Maximum wires of a merged block
        #[arg(short, long)]
        width: Option<usize>,

        /// Skip the cancellation pass
        #[arg(long)]
        no_cancel: bool,

        /// Scheduled output file
        #[arg(short, long)]
        output: Option<String>,

        /// Write the dependency graph in DOT format
        #[arg(long)]
        dot: Option<String>,

        /// Check that the compiled circuit has the input's unitary
        #[arg(long)]
        verify: bool,
    },

    /// Parse a circuit and report its structure
    Check {
        /// Circuit file
        #[arg(short, long)]
        input: String,

        /// Gate-duration file
        #[arg(short, long)]
        durations: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Compile {
            input,
            durations,
            config,
            width,
            no_cancel,
            output,
            dot,
            verify,
        } => compile::execute(&CompileOptions {
            input: &input,
            durations: durations.as_deref(),
            config: config.as_deref(),
            block_width: width,
            no_cancel,
            output: output.as_deref(),
            dot: dot.as_deref(),
            verify,
        }),

        Commands::Check { input, durations } => check::execute(&input, durations.as_deref()),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
