//! The CLI pipeline without the binary: snapshot JSON from disk, config
//! from TOML, analysis, rendering, exit-code selection.

use std::io::Write;

use logsafe::config::{AnalysisConfig, MissingSymbols};
use logsafe::error::exit_code;
use logsafe::ir::{Location, Program, ProgramBuilder, Stmt, TypeRef};
use logsafe::report::{render_text, to_json, ReportSummary};
use logsafe::safety::{analyze_program, SafetyLevel};

fn sample_program() -> Program {
    let mut b = ProgramBuilder::new();
    let string_ty = b.class("String");
    let token = b.field(
        "token",
        TypeRef::simple(string_ty),
        Some(SafetyLevel::Unsafe),
    );
    let message = b.param(
        "message",
        TypeRef::simple(string_ty),
        Some(SafetyLevel::Safe),
    );
    let log = b.method("log", TypeRef::simple(string_ty), None, vec![message], None);
    let read = b.reference(token, Location::new("Audit.java", 4, 9));
    let call = b.invoke(log, None, vec![read], Location::new("Audit.java", 4, 5));
    let run = b.method_with_body(
        "run",
        TypeRef::simple(string_ty),
        None,
        vec![],
        vec![Stmt::Expr(call)],
    );
    b.unit("Audit.java", vec![], vec![run]);
    b.finish()
}

#[test]
fn snapshot_survives_a_disk_round_trip() {
    let program = sample_program();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&program).unwrap().as_bytes())
        .unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    let loaded: Program = serde_json::from_str(&text).unwrap();

    let reports = analyze_program(&loaded, &AnalysisConfig::default()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].violations.len(), 1);
    assert_eq!(reports[0].violations[0].computed, SafetyLevel::Unsafe);
}

#[test]
fn config_file_round_trip_switches_modes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"missing_symbols = \"lenient\"\n").unwrap();

    let config = AnalysisConfig::from_toml_path(file.path()).unwrap();
    assert_eq!(config.missing_symbols, MissingSymbols::Lenient);
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = AnalysisConfig::from_toml_path(&missing).unwrap_err();
    assert_eq!(err.exit_code(), exit_code::IO_ERROR);
}

#[test]
fn malformed_snapshot_json_is_rejected() {
    let result: Result<Program, _> = serde_json::from_str("{\"types\": 12}");
    assert!(result.is_err());
}

#[test]
fn rendering_and_exit_codes_agree() {
    let program = sample_program();
    let reports = analyze_program(&program, &AnalysisConfig::default()).unwrap();

    let text = render_text(&reports);
    assert!(text.contains("Audit.java:4:9"));
    assert!(text.contains("1 violation(s)"));

    let json = to_json(&reports).unwrap();
    assert!(json.contains("\"computed\": \"unsafe\""));
    assert!(json.contains("\"required\": \"safe\""));

    assert_eq!(
        ReportSummary::of(&reports).exit_code(),
        exit_code::VIOLATIONS
    );
}

#[test]
fn clean_program_renders_a_zero_summary() {
    let mut b = ProgramBuilder::new();
    let string_ty = b.class("String");
    let noop = b.method(
        "noop",
        TypeRef::simple(string_ty),
        None,
        vec![],
        Some(vec![]),
    );
    b.unit("Empty.java", vec![], vec![noop]);
    let reports = analyze_program(&b.finish(), &AnalysisConfig::default()).unwrap();

    assert_eq!(ReportSummary::of(&reports).exit_code(), exit_code::CLEAN);
    assert!(render_text(&reports).contains("0 violation(s)"));
}
