//! Gate-duration table.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{GATE_NAMES, StandardGate};

/// Op-code name to duration, loaded once per compilation.
///
/// A lookup miss is a configuration error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateDurations {
    table: FxHashMap<String, f64>,
}

impl GateDurations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every known op-code with the same duration.
    pub fn uniform(duration: f64) -> Self {
        let mut table = Self::new();
        for name in GATE_NAMES {
            table.table.insert(name.to_string(), duration);
        }
        table
    }

    /// Set the duration of an op-code, rejecting negative or non-finite values.
    pub fn insert(&mut self, name: impl Into<String>, duration: f64) -> IrResult<()> {
        let name = name.into();
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(IrError::InvalidDuration {
                gate_name: name,
                value: duration,
            });
        }
        // The input alias and the canonical name share one entry.
        let name = if name == "h" { "H".to_string() } else { name };
        self.table.insert(name, duration);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, duration: f64) -> IrResult<Self> {
        self.insert(name, duration)?;
        Ok(self)
    }

    /// Duration of a gate.
    pub fn get(&self, gate: &StandardGate) -> IrResult<f64> {
        self.get_by_name(gate.name())
    }

    /// Duration of an op-code by name.
    pub fn get_by_name(&self, name: &str) -> IrResult<f64> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| IrError::MissingDuration(name.to_string()))
    }

    /// Number of configured op-codes.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
