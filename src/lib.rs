//! Log-safety lattice classifier.
//!
//! `logsafe` computes, for every expression of a resolved program snapshot,
//! a [`SafetyLevel`] describing how permissible it is to log the value, and
//! flags every flow of a sensitive value into a sink whose declared
//! tolerance it exceeds.
//!
//! The crate is the host-independent core of an "unsafe logging argument"
//! checker: a host compiler (or test harness) resolves source code into the
//! [`ir::Program`] snapshot, and `logsafe` owns the lattice, the
//! classification rules and the violation set. Parsing, symbol resolution
//! and diagnostic presentation stay on the host side.
//!
//! # Quick start
//!
//! ```
//! use logsafe::config::AnalysisConfig;
//! use logsafe::ir::{Location, ProgramBuilder, TypeRef};
//! use logsafe::safety::{analyze_program, SafetyLevel};
//!
//! let mut b = ProgramBuilder::new();
//! let string_ty = b.class("String");
//! let token_ty = b.class("AuthToken");
//! b.annotate_type(token_ty, SafetyLevel::Unsafe);
//!
//! let field = b.field("token", TypeRef::simple(token_ty), None);
//! let param = b.param("message", TypeRef::simple(string_ty), Some(SafetyLevel::Safe));
//! let log = b.method("log", TypeRef::simple(string_ty), None, vec![param], None);
//!
//! let read = b.reference(field, Location::new("Audit.java", 12, 9));
//! let call = b.invoke(log, None, vec![read], Location::new("Audit.java", 12, 5));
//! let run = b.method_with_body("run", TypeRef::simple(string_ty), None, vec![], vec![
//!     logsafe::ir::Stmt::Expr(call),
//! ]);
//! b.unit("Audit.java", vec![token_ty], vec![run]);
//!
//! let program = b.finish();
//! let reports = analyze_program(&program, &AnalysisConfig::default()).unwrap();
//! assert_eq!(reports[0].violations.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod ir;
pub mod report;
pub mod safety;

pub use config::{AnalysisConfig, MissingSymbols};
pub use error::{exit_code, ClassifyError, LogsafeError};
pub use ir::{Location, Program, ProgramBuilder};
pub use report::{render_text, to_json, OutputFormat, ReportSummary};
pub use safety::{
    analyze_program, analyze_unit, Classifier, SafetyLevel, Sink, SinkKind, UnitReport, Violation,
};
