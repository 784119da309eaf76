//! Safety classification and flow checking.
//!
//! The safety analysis consists of four components:
//!
//! 1. **Levels** ([`level`]): the three-point lattice `Safe < DoNotLog <
//!    Unsafe` with join/meet and the sink-admission order.
//! 2. **Hierarchy** ([`hierarchy`]): type-level annotation resolution —
//!    inherited annotations join to the most restrictive, containers
//!    carry their type arguments' sensitivity, lenient subtypes are
//!    flagged at the declaration site.
//! 3. **Passthrough** ([`passthrough`]): the registry of well-known
//!    identity and accumulating operations for methods the snapshot has
//!    no bodies for.
//! 4. **Classifier** ([`classify`]): the priority classification rules,
//!    sink checking, and the per-unit walk with monotone array/builder
//!    state.
//!
//! # Classification semantics
//!
//! ```text
//! x annotated        => level(x) = annotation(x)
//! x : AnnotatedType  => level(x) = join over the type hierarchy
//! a + b              => level = level(a) v level(b)
//! f(...) with body   => level = join over f's return expressions
//! checkNotNull(v)    => level = level(v)            (passthrough)
//! throwable e        => level >= UNSAFE unless its type says otherwise
//! arr[i] = v         => level(arr) joins level(v) for the rest of the body
//! ```
//!
//! # Usage
//!
//! Units are independent; [`analyze_program`] fans them out in parallel
//! and keeps the input order. Every invocation builds its own
//! classifier, so nothing is shared between units.

pub mod classify;
pub mod hierarchy;
pub mod level;
pub mod passthrough;
pub mod types;

pub use classify::{AccumState, Classifier};
pub use hierarchy::TypeHierarchy;
pub use level::SafetyLevel;
pub use passthrough::{MatchStrategy, PassthroughKind, PassthroughPattern, PassthroughRegistry};
pub use types::{Diagnostic, Sink, SinkKind, UnitReport, Violation, ViolationKind};

use rayon::prelude::*;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::LogsafeError;
use crate::ir::{CompilationUnit, Program};

use classify::UnitAnalyzer;

/// Analyze one compilation unit of a snapshot.
///
/// Violations are collected independently; an unresolved reference in
/// strict mode fails this unit only, yielding a report with an
/// internal-error diagnostic. Fails early only on an invalid config.
pub fn analyze_unit(
    program: &Program,
    unit: &CompilationUnit,
    config: &AnalysisConfig,
) -> Result<UnitReport, LogsafeError> {
    let classifier = Classifier::new(program, config)?;
    Ok(UnitAnalyzer::new(classifier, &unit.name, config.max_violations).run(unit))
}

/// Analyze every compilation unit of a snapshot.
///
/// Units are embarrassingly parallel: each gets its own classifier and
/// the results come back in unit order.
pub fn analyze_program(
    program: &Program,
    config: &AnalysisConfig,
) -> Result<Vec<UnitReport>, LogsafeError> {
    let registry = PassthroughRegistry::with_patterns(&config.passthrough)
        .map_err(|err| LogsafeError::Config(format!("invalid passthrough pattern: {err}")))?;
    debug!(units = program.units.len(), "analyzing snapshot");
    let reports = program
        .units
        .par_iter()
        .map(|unit| {
            let classifier = Classifier::with_registry(program, config, registry.clone());
            UnitAnalyzer::new(classifier, &unit.name, config.max_violations).run(unit)
        })
        .collect();
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DeclId, Location, ProgramBuilder, Stmt, TypeRef};

    #[test]
    fn program_reports_come_back_in_unit_order() {
        let mut b = ProgramBuilder::new();
        let string_ty = b.class("String");
        let noop = b.method(
            "noop",
            TypeRef::simple(string_ty),
            None,
            vec![],
            Some(vec![]),
        );
        b.unit("B.java", vec![], vec![noop]);
        b.unit("A.java", vec![], vec![]);
        let program = b.finish();

        let reports = analyze_program(&program, &AnalysisConfig::default()).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].unit, "B.java");
        assert_eq!(reports[1].unit, "A.java");
        assert!(reports.iter().all(UnitReport::is_clean));
    }

    #[test]
    fn failed_unit_does_not_block_the_others() {
        let mut b = ProgramBuilder::new();
        let string_ty = b.class("String");
        // Unit 0 initializes an annotated local from a dangling reference,
        // which strict mode refuses to classify.
        let sink_local = b.local("message", TypeRef::simple(string_ty), Some(SafetyLevel::Safe));
        let dangling = b.reference(DeclId(99), Location::new("Bad.java", 1, 1));
        let bad = b.method(
            "bad",
            TypeRef::simple(string_ty),
            None,
            vec![],
            Some(vec![Stmt::Local {
                decl: sink_local,
                init: Some(dangling),
            }]),
        );
        b.unit("Bad.java", vec![], vec![bad]);
        // Unit 1 is fine.
        let ok = b.method("ok", TypeRef::simple(string_ty), None, vec![], Some(vec![]));
        b.unit("Ok.java", vec![], vec![ok]);
        let program = b.finish();

        let reports = analyze_program(&program, &AnalysisConfig::default()).unwrap();
        assert!(reports[0].failed);
        assert_eq!(reports[0].diagnostics.len(), 1);
        assert!(reports[0].violations.is_empty());
        assert!(reports[1].is_clean());
    }

    #[test]
    fn invalid_passthrough_pattern_is_a_config_error() {
        let mut config = AnalysisConfig::default();
        config.passthrough.push(PassthroughPattern {
            pattern: "(".into(),
            strategy: MatchStrategy::Regex,
            kind: PassthroughKind::Identity,
        });
        let program = ProgramBuilder::new().finish();
        assert!(matches!(
            analyze_program(&program, &config),
            Err(LogsafeError::Config(_))
        ));
    }
}
