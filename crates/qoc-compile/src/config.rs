//! Compiler configuration.
//!
//! Every field has a default, so an empty YAML or JSON document is a valid
//! configuration:
//!
//! ```yaml
//! block_width: 3
//! diagonal_lookahead: 6
//! cancellation: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CompileError, CompileResult};

/// Tunables for the optimization pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Wire budget for block merging. `None` skips the pass.
    #[serde(default)]
    pub block_width: Option<usize>,

    /// Number of successor blocks the diagonal merge looks through
    /// (blocks `idx+1 .. idx+lookahead`).
    #[serde(default = "default_lookahead")]
    pub diagonal_lookahead: usize,

    /// Largest commuting-peer list whose power set the diagonal merge
    /// enumerates; peers past this bound are ignored.
    #[serde(default = "default_max_commuting_peers")]
    pub max_commuting_peers: usize,

    /// Merge attempts per queued gate before block merging gives up on it.
    #[serde(default = "default_max_merge_attempts")]
    pub max_merge_attempts: usize,

    /// Run the cancellation loop before diagonal merging.
    #[serde(default = "default_true")]
    pub cancellation: bool,

    /// Schedule again after block merging.
    #[serde(default = "default_true")]
    pub reschedule: bool,
}

fn default_lookahead() -> usize {
    6
}

fn default_max_commuting_peers() -> usize {
    8
}

fn default_max_merge_attempts() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            block_width: None,
            diagonal_lookahead: default_lookahead(),
            max_commuting_peers: default_max_commuting_peers(),
            max_merge_attempts: default_max_merge_attempts(),
            cancellation: true,
            reschedule: true,
        }
    }
}

impl CompileConfig {
    /// Load a configuration file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CompileResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> CompileResult<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml_ng::from_str(contents)
            .map_err(|e| CompileError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(contents: &str) -> CompileResult<Self> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| CompileError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the block-merge wire budget.
    #[must_use]
    pub fn with_block_width(mut self, width: usize) -> Self {
        self.block_width = Some(width);
        self
    }

    /// Enable or disable the cancellation loop.
    #[must_use]
    pub fn with_cancellation(mut self, enabled: bool) -> Self {
        self.cancellation = enabled;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CompileResult<()> {
        if self.block_width == Some(0) {
            return Err(CompileError::InvalidConfiguration(
                "block_width must be at least 1".into(),
            ));
        }
        if self.diagonal_lookahead == 0 {
            return Err(CompileError::InvalidConfiguration(
                "diagonal_lookahead must be at least 1".into(),
            ));
        }
        // 2^n subsets are enumerated per gate.
        if self.max_commuting_peers > 16 {
            return Err(CompileError::InvalidConfiguration(format!(
                "max_commuting_peers {} exceeds 16",
                self.max_commuting_peers
            )));
        }
        if self.max_merge_attempts == 0 {
            return Err(CompileError::InvalidConfiguration(
                "max_merge_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompileConfig::default();
        assert_eq!(config.block_width, None);
        assert_eq!(config.diagonal_lookahead, 6);
        assert_eq!(config.max_merge_attempts, 1000);
        assert!(config.cancellation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = CompileConfig::from_yaml("block_width: 3\ncancellation: false\n").unwrap();
        assert_eq!(config.block_width, Some(3));
        assert!(!config.cancellation);
        assert_eq!(config.max_commuting_peers, 8);
        assert!(config.reschedule);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(CompileConfig::from_yaml("").unwrap(), CompileConfig::default());
    }

    #[test]
    fn test_json_config() {
        let config = CompileConfig::from_json(r#"{"diagonal_lookahead": 4}"#).unwrap();
        assert_eq!(config.diagonal_lookahead, 4);
        assert_eq!(config.block_width, None);
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let config = CompileConfig::default().with_block_width(0);
        assert!(matches!(
            config.validate(),
            Err(CompileError::InvalidConfiguration(_))
        ));
        assert!(CompileConfig::from_yaml("block_width: 0").is_err());
    }

    #[test]
    fn test_unparseable_config() {
        assert!(matches!(
            CompileConfig::from_yaml("block_width: [1, 2"),
            Err(CompileError::ConfigParse(_))
        ));
    }
}
