//! Configuration file support.
//!
//! Looked up in this order:
//! 1. the file given with `--config`
//! 2. `<config_dir>/qobf/config.yaml` when it exists
//! 3. built-in defaults
//!
//! Every key is optional. Command-line flags override file values.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use qobf_circuit::CircuitLimits;
use qobf_program::{DEFAULT_PROVIDED_IMPORTS, DependencySplitter, SymbolRenamer};

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QobfConfig {
    pub circuit: CircuitConfig,
    pub program: ProgramConfig,
}

/// Circuit pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CircuitConfig {
    /// Circuits with more qubits are rejected
    pub max_qubits: usize,

    /// Deeper circuits produce a warning
    pub max_depth: usize,

    /// Wall-clock budget for one run, in seconds
    pub timeout_secs: u64,

    /// Directory holding the catalog JSON files; built-in catalogs if unset
    pub data_dir: Option<PathBuf>,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        let limits = CircuitLimits::default();
        Self {
            max_qubits: limits.max_qubits,
            max_depth: limits.max_depth,
            timeout_secs: limits.timeout.as_secs(),
            data_dir: None,
        }
    }
}

impl CircuitConfig {
    pub fn limits(&self) -> CircuitLimits {
        CircuitLimits {
            max_qubits: self.max_qubits,
            max_depth: self.max_depth,
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Program pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramConfig {
    /// Top-level imports dropped from the payload because every template
    /// already provides them
    pub provided_imports: Vec<String>,

    /// Function names copied into both fragments by the `shroud` splitter
    pub protected: Vec<String>,

    /// Prefix of generated identifiers
    pub identifier_prefix: String,

    /// Directory of `<template>.tmpl` files; built-in templates if unset
    pub template_dir: Option<PathBuf>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        let renamer = SymbolRenamer::new();
        Self {
            provided_imports: DEFAULT_PROVIDED_IMPORTS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            protected: Vec::new(),
            identifier_prefix: renamer.prefix().to_string(),
            template_dir: None,
        }
    }
}

impl ProgramConfig {
    pub fn renamer(&self) -> SymbolRenamer {
        SymbolRenamer::new()
            .with_provided_imports(&self.provided_imports)
            .with_prefix(&self.identifier_prefix)
    }

    pub fn splitter(&self) -> DependencySplitter {
        DependencySplitter::new().with_protected(&self.protected)
    }
}

impl QobfConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    /// Read a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load from `explicit`, else from the default location, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("Loading config from {}", path.display());
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => {
                debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// `<config_dir>/qobf/config.yaml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qobf").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_library() {
        let config = QobfConfig::default();
        assert_eq!(config.circuit.limits(), CircuitLimits::default());
        assert_eq!(config.program.provided_imports.len(), DEFAULT_PROVIDED_IMPORTS.len());
        assert_eq!(config.program.identifier_prefix, "var");
        assert!(config.program.protected.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = QobfConfig::from_yaml(
            "circuit:\n  max_qubits: 8\n  timeout_secs: 5\nprogram:\n  protected: [setup]\n",
        )
        .unwrap();
        assert_eq!(config.circuit.max_qubits, 8);
        assert_eq!(config.circuit.max_depth, 1000);
        assert_eq!(config.circuit.limits().timeout, Duration::from_secs(5));
        assert_eq!(config.program.protected, vec!["setup".to_string()]);
        assert_eq!(config.program.identifier_prefix, "var");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(QobfConfig::from_yaml("{}").unwrap(), QobfConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(QobfConfig::from_yaml("circuit:\n  max_qbits: 3\n").is_err());
    }

    #[test]
    fn test_program_builders() {
        let config = QobfConfig::from_yaml(
            "program:\n  provided_imports: [numpy]\n  identifier_prefix: sym\n  protected: [main]\n",
        )
        .unwrap();
        let renamer = config.program.renamer();
        assert_eq!(renamer.prefix(), "sym");
        assert!(renamer.is_provided("numpy"));
        assert!(!renamer.is_provided("math"));
        assert_eq!(config.program.splitter().protected(), ["main".to_string()]);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qobf.yaml");
        fs::write(&path, "circuit:\n  data_dir: /opt/catalogs\n").unwrap();
        let config = QobfConfig::load(Some(&path)).unwrap();
        assert_eq!(config.circuit.data_dir, Some(PathBuf::from("/opt/catalogs")));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = QobfConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config file"));
    }
}
