//! Rendering of analysis reports.
//!
//! Two formats: a human-readable text listing for terminals, and a JSON
//! envelope for programmatic consumption. The envelope carries a summary
//! so consumers can gate on counts without walking every unit.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::exit_code;
use crate::safety::UnitReport;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Aggregate counts over a set of unit reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub units: usize,
    pub failed_units: usize,
    pub violations: usize,
    pub diagnostics: usize,
}

impl ReportSummary {
    pub fn of(reports: &[UnitReport]) -> Self {
        Self {
            units: reports.len(),
            failed_units: reports.iter().filter(|r| r.failed).count(),
            violations: reports.iter().map(|r| r.violations.len()).sum(),
            diagnostics: reports.iter().map(|r| r.diagnostics.len()).sum(),
        }
    }

    /// Exit code the whole run maps to: internal errors dominate,
    /// then violations, then clean.
    pub fn exit_code(&self) -> i32 {
        if self.failed_units > 0 {
            exit_code::INTERNAL_ERROR
        } else if self.violations > 0 {
            exit_code::VIOLATIONS
        } else {
            exit_code::CLEAN
        }
    }
}

/// JSON envelope written by `--format json`.
#[derive(Debug, Serialize)]
struct ReportEnvelope<'a> {
    tool: &'static str,
    version: &'static str,
    summary: ReportSummary,
    units: &'a [UnitReport],
}

/// Serialize reports as the JSON envelope.
pub fn to_json(reports: &[UnitReport]) -> Result<String, serde_json::Error> {
    let envelope = ReportEnvelope {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        summary: ReportSummary::of(reports),
        units: reports,
    };
    serde_json::to_string_pretty(&envelope)
}

/// Render reports as human-readable text, one line per finding.
pub fn render_text(reports: &[UnitReport]) -> String {
    let mut out = String::new();
    for report in reports {
        for violation in &report.violations {
            out.push_str(&violation.to_string());
            out.push('\n');
        }
        for diagnostic in &report.diagnostics {
            out.push_str(&format!("{}: error: {diagnostic}\n", report.unit));
        }
        if report.truncated {
            out.push_str(&format!(
                "{}: note: violation list truncated by max_violations\n",
                report.unit
            ));
        }
    }
    let summary = ReportSummary::of(reports);
    out.push_str(&format!(
        "{} violation(s), {} diagnostic(s) across {} unit(s)\n",
        summary.violations, summary.diagnostics, summary.units
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Location;
    use crate::safety::{Diagnostic, SafetyLevel, SinkKind, Violation, ViolationKind};

    fn sample_reports() -> Vec<UnitReport> {
        let clean = UnitReport::new("Clean.java");
        let mut dirty = UnitReport::new("Dirty.java");
        dirty.violations.push(Violation {
            kind: ViolationKind::SinkFlow(SinkKind::Argument {
                method: "log".into(),
                parameter: "message".into(),
            }),
            computed: SafetyLevel::Unsafe,
            required: SafetyLevel::Safe,
            location: Location::new("Dirty.java", 7, 3),
        });
        vec![clean, dirty]
    }

    #[test]
    fn summary_counts_violations_and_units() {
        let reports = sample_reports();
        let summary = ReportSummary::of(&reports);
        assert_eq!(summary.units, 2);
        assert_eq!(summary.violations, 1);
        assert_eq!(summary.failed_units, 0);
        assert_eq!(summary.exit_code(), exit_code::VIOLATIONS);
    }

    #[test]
    fn clean_run_exits_zero() {
        let summary = ReportSummary::of(&[UnitReport::new("A.java")]);
        assert_eq!(summary.exit_code(), exit_code::CLEAN);
    }

    #[test]
    fn failed_unit_dominates_the_exit_code() {
        let mut report = UnitReport::new("A.java");
        report.failed = true;
        report.diagnostics.push(Diagnostic {
            message: "internal error: unresolved declaration decl#9".into(),
            location: None,
        });
        let summary = ReportSummary::of(&[report]);
        assert_eq!(summary.exit_code(), exit_code::INTERNAL_ERROR);
    }

    #[test]
    fn text_output_lists_each_violation_with_location() {
        let text = render_text(&sample_reports());
        assert!(text.contains("Dirty.java:7:3"));
        assert!(text.contains("UNSAFE"));
        assert!(text.contains("1 violation(s)"));
    }

    #[test]
    fn json_envelope_names_the_tool() {
        let json = to_json(&sample_reports()).unwrap();
        assert!(json.contains("\"tool\": \"logsafe\""));
        assert!(json.contains("\"violations\": 1"));
    }
}
