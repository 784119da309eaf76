//! Analysis configuration.
//!
//! Loadable from a TOML file; every field has a conservative default so
//! an absent config behaves like a strict, built-ins-only analysis.
//!
//! # Example config
//!
//! ```toml
//! missing_symbols = "lenient"
//! max_violations = 200
//!
//! [[passthrough]]
//! pattern = "unwrapSecret"
//! strategy = "exact"
//! kind = "identity"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LogsafeError;
use crate::safety::passthrough::PassthroughPattern;

/// How the classifier treats references it cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSymbols {
    /// Fail the analysis pass for the affected compilation unit and
    /// report an internal-error diagnostic. The default.
    #[default]
    Strict,
    /// Tolerate incomplete snapshots: an unresolved reference
    /// classifies as `Safe` (the most permissive assumption).
    Lenient,
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Unresolved-reference handling.
    #[serde(default)]
    pub missing_symbols: MissingSymbols,

    /// Extra passthrough operations on top of the built-in registry.
    #[serde(default)]
    pub passthrough: Vec<PassthroughPattern>,

    /// Cap on violations recorded per compilation unit. `None` collects
    /// everything; when the cap truncates, the unit report says so.
    #[serde(default)]
    pub max_violations: Option<usize>,
}

impl AnalysisConfig {
    /// A config that tolerates incomplete snapshots.
    pub fn lenient() -> Self {
        Self {
            missing_symbols: MissingSymbols::Lenient,
            ..Self::default()
        }
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LogsafeError> {
        toml::from_str(text).map_err(|e| LogsafeError::Config(e.to_string()))
    }

    /// Load a config from a TOML file.
    pub fn from_toml_path(path: &Path) -> Result<Self, LogsafeError> {
        let text = std::fs::read_to_string(path).map_err(|source| LogsafeError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
