//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use qoc_compile::CompileConfig;
use qoc_ir::GateDurations;
use qoc_qasm::{ParsedCircuit, parse_circuit, parse_durations};

/// Duration given to every op-code when no duration file is passed.
pub const DEFAULT_DURATION: f64 = 1.0;

fn read_source(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

/// Load and check a circuit file.
pub fn load_circuit(path: &str) -> Result<ParsedCircuit> {
    let source = read_source(path)?;
    parse_circuit(&source).with_context(|| format!("Failed to parse circuit: {path}"))
}

/// Load the gate-duration table, or a uniform one if no file is given.
pub fn load_durations(path: Option<&str>) -> Result<GateDurations> {
    match path {
        Some(path) => {
            let source = read_source(path)?;
            parse_durations(&source).with_context(|| format!("Failed to parse durations: {path}"))
        }
        None => {
            warn!("no duration file given, every gate takes {DEFAULT_DURATION}");
            Ok(GateDurations::uniform(DEFAULT_DURATION))
        }
    }
}

/// Load the pipeline configuration and apply command-line overrides.
pub fn load_config(
    path: Option<&str>,
    block_width: Option<usize>,
    no_cancel: bool,
) -> Result<CompileConfig> {
    let mut config = match path {
        Some(path) => CompileConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config: {path}"))?,
        None => CompileConfig::default(),
    };
    if let Some(width) = block_width {
        config = config.with_block_width(width);
    }
    if no_cancel {
        config = config.with_cancellation(false);
    }
    config.validate()?;
    Ok(config)
}

/// Default output path: the input's file stem with `suffix` appended.
pub fn default_output(input: &str, suffix: &str) -> String {
    let stem = Path::new(input)
        .file_stem()
        .map_or_else(|| "circuit".into(), |s| s.to_string_lossy());
    format!("{stem}{suffix}")
}
