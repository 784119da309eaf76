//! Error types for the classifier and the CLI driver.

use std::path::PathBuf;

use thiserror::Error;

use crate::ir::{DeclId, ExprId, Location, TypeId};

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

/// Process exit codes for the `logsafe` CLI.
///
/// These follow a Unix-style convention where 0 is success and higher
/// values indicate increasingly severe problems.
pub mod exit_code {
    /// No violations found (clean).
    pub const CLEAN: i32 = 0;
    /// Safety violations were found.
    pub const VIOLATIONS: i32 = 1;
    /// Configuration error (bad config file, invalid CLI args).
    pub const CONFIG_ERROR: i32 = 2;
    /// I/O error (file not found, permission denied, etc.).
    pub const IO_ERROR: i32 = 3;
    /// Internal error (unresolved snapshot in strict mode, or a bug).
    pub const INTERNAL_ERROR: i32 = 4;
}

// ---------------------------------------------------------------------------
// Classification errors
// ---------------------------------------------------------------------------

/// Nesting depth at which classification gives up on an expression tree.
///
/// A well-formed snapshot never comes close; the guard exists so that a
/// malformed (cyclic) expression arena fails the unit instead of
/// overflowing the stack.
pub const MAX_EXPR_DEPTH: usize = 512;

/// Errors raised while classifying expressions of a program snapshot.
///
/// These are internal errors of the snapshot itself (dangling ids,
/// malformed arenas), never safety violations. In lenient mode the
/// classifier degrades to [`SafetyLevel::Safe`] instead of raising them;
/// in strict mode they fail the analysis pass for the affected
/// compilation unit only.
///
/// [`SafetyLevel::Safe`]: crate::safety::SafetyLevel::Safe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unresolved declaration {0}")]
    UnresolvedDecl(DeclId),

    #[error("unresolved type {0}")]
    UnresolvedType(TypeId),

    #[error("unresolved expression {0}")]
    UnresolvedExpr(ExprId),

    #[error("expression nesting too deep at {0}")]
    TooDeep(Location),
}

// ---------------------------------------------------------------------------
// Top-level errors
// ---------------------------------------------------------------------------

/// Main error type for the `logsafe` CLI driver.
#[derive(Error, Debug)]
pub enum LogsafeError {
    #[error("I/O error reading {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid program snapshot in {path}: {source}")]
    Snapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl LogsafeError {
    /// The process exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            LogsafeError::FileRead { .. } => exit_code::IO_ERROR,
            LogsafeError::Snapshot { .. } | LogsafeError::Config(_) => exit_code::CONFIG_ERROR,
            LogsafeError::Json(_) | LogsafeError::Classify(_) => exit_code::INTERNAL_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, LogsafeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_error_display_names_the_id() {
        let err = ClassifyError::UnresolvedDecl(DeclId(7));
        assert!(err.to_string().contains("decl#7"));
    }

    #[test]
    fn exit_codes_are_ordered_by_severity() {
        assert!(exit_code::CLEAN < exit_code::VIOLATIONS);
        assert!(exit_code::VIOLATIONS < exit_code::CONFIG_ERROR);
        assert!(exit_code::CONFIG_ERROR < exit_code::IO_ERROR);
        assert!(exit_code::IO_ERROR < exit_code::INTERNAL_ERROR);
    }

    #[test]
    fn snapshot_error_maps_to_config_exit() {
        let err = LogsafeError::Config("bad".into());
        assert_eq!(err.exit_code(), exit_code::CONFIG_ERROR);
    }
}
