//! Configuration loading for thresholds and scan behavior.
//!
//! Defaults are tuned for typical Rust codebases; a `reforge.toml` at the
//! project root overrides any subset of fields.

use crate::core::Severity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE: &str = "reforge.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReforgeConfig {
    pub thresholds: Thresholds,
    /// Bounded worker pool for unit-level scanning.
    pub jobs: usize,
    /// Smells below this severity are dropped from analysis plans.
    pub min_severity: Severity,
}

impl Default for ReforgeConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            jobs: 4,
            min_severity: Severity::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A method longer than this (in lines) is a long-method smell.
    pub long_method_lines: usize,
    /// Nesting deeper than this is a deep-nesting smell.
    pub deep_nesting: u32,
    /// A type with at least this many methods is a god-class candidate.
    pub god_class_methods: usize,
    /// Responsibilities required before a god class is worth splitting.
    pub god_class_min_responsibilities: usize,
    /// Minimum match arms for replace-conditional to engage.
    pub min_match_arms: usize,
    /// Minimum statements in an extract-method block.
    pub min_extract_block: usize,
    /// Public methods required before extract-interface engages.
    pub extract_interface_min_public: usize,
    /// Parameters beyond this count are a long-parameter-list smell.
    pub long_parameter_list: usize,
    /// Fraction of a method body an `if` must wrap to become a guard clause.
    pub guard_body_fraction: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            long_method_lines: 30,
            deep_nesting: 4,
            god_class_methods: 15,
            god_class_min_responsibilities: 3,
            min_match_arms: 3,
            min_extract_block: 3,
            extract_interface_min_public: 5,
            long_parameter_list: 5,
            guard_body_fraction: 0.7,
        }
    }
}

impl ReforgeConfig {
    /// Load configuration from `dir/reforge.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReforgeConfig::load(dir.path()).unwrap();
        assert_eq!(config, ReforgeConfig::default());
    }

    #[test]
    fn partial_file_overrides_subset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "jobs = 8\n[thresholds]\nlong_method_lines = 60\n",
        )
        .unwrap();
        let config = ReforgeConfig::load(dir.path()).unwrap();
        assert_eq!(config.jobs, 8);
        assert_eq!(config.thresholds.long_method_lines, 60);
        assert_eq!(config.thresholds.deep_nesting, 4);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "jobs = \"many\"\n").unwrap();
        assert!(ReforgeConfig::load(dir.path()).is_err());
    }
}
