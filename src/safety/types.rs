//! Violation and report types produced by the classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::ir::Location;
use crate::safety::level::SafetyLevel;

// =============================================================================
// Sinks
// =============================================================================

/// The syntactic shape of a consumption point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Argument bound to an annotated parameter.
    Argument { method: String, parameter: String },
    /// Argument bound to a parameter whose type is an annotated type
    /// parameter; the binding site is checked like any other sink.
    TypeParamBinding {
        method: String,
        parameter: String,
        type_param: String,
    },
    /// Assignment (or initialization) of an annotated target.
    Assignment { target: String },
    /// Element store into an annotated array.
    ArrayStore { array: String },
    /// Return position of a method with a declared return annotation.
    Return { method: String },
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Argument { method, parameter } => {
                write!(f, "parameter `{parameter}` of `{method}`")
            }
            SinkKind::TypeParamBinding {
                method,
                parameter,
                type_param,
            } => write!(
                f,
                "type parameter `{type_param}` bound at parameter `{parameter}` of `{method}`"
            ),
            SinkKind::Assignment { target } => write!(f, "assignment to `{target}`"),
            SinkKind::ArrayStore { array } => write!(f, "element store into `{array}`"),
            SinkKind::Return { method } => write!(f, "return value of `{method}`"),
        }
    }
}

/// A consumption point with its declared tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sink {
    pub kind: SinkKind,
    pub required: SafetyLevel,
    pub location: Location,
}

impl Sink {
    pub fn new(kind: SinkKind, required: SafetyLevel, location: Location) -> Self {
        Self {
            kind,
            required,
            location,
        }
    }
}

// =============================================================================
// Violations
// =============================================================================

/// What kind of incompatibility a [`Violation`] reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A value flowed into a sink whose tolerance it exceeds.
    SinkFlow(SinkKind),
    /// A subtype declares a less restrictive level than an ancestor.
    LenientSubtype { subtype: String, ancestor: String },
}

/// A detected incompatibility between a computed level and a required
/// level, at a specific syntactic location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Level computed for the flowing value (or declared by the subtype).
    pub computed: SafetyLevel,
    /// Level the destination tolerates (or the ancestors require).
    pub required: SafetyLevel,
    pub location: Location,
}

impl Violation {
    /// Human-readable one-line description.
    pub fn message(&self) -> String {
        match &self.kind {
            ViolationKind::SinkFlow(sink) => format!(
                "{} value flows into {} which tolerates at most {}",
                self.computed, sink, self.required
            ),
            ViolationKind::LenientSubtype { subtype, ancestor } => format!(
                "`{subtype}` declares {} but inherits {} from `{ancestor}`; a subtype cannot \
                 be more permissive than its ancestors",
                self.computed, self.required
            ),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message())
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// An internal-error diagnostic, distinct from a safety violation.
///
/// Produced when a compilation unit cannot be analyzed (dangling ids in
/// strict mode, malformed arenas). Other units are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn internal(err: &ClassifyError) -> Self {
        let location = match err {
            ClassifyError::TooDeep(loc) => Some(loc.clone()),
            _ => None,
        };
        Self {
            message: format!("internal error: {err}"),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// =============================================================================
// Unit report
// =============================================================================

/// Analysis result for a single compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: String,
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// True when strict mode aborted the unit on an internal error.
    #[serde(default)]
    pub failed: bool,
    /// True when the configured violation cap truncated the list.
    #[serde(default)]
    pub truncated: bool,
}

impl UnitReport {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            violations: Vec::new(),
            diagnostics: Vec::new(),
            failed: false,
            truncated: false,
        }
    }

    /// No violations and no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.diagnostics.is_empty() && !self.failed
    }

    /// Most restrictive computed level among the violations, if any.
    pub fn worst_level(&self) -> Option<SafetyLevel> {
        self.violations.iter().map(|v| v.computed).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_flow_message_names_both_levels() {
        let v = Violation {
            kind: ViolationKind::SinkFlow(SinkKind::Argument {
                method: "log".into(),
                parameter: "message".into(),
            }),
            computed: SafetyLevel::Unsafe,
            required: SafetyLevel::Safe,
            location: Location::new("Audit.java", 12, 5),
        };
        let text = v.to_string();
        assert!(text.contains("UNSAFE"));
        assert!(text.contains("SAFE"));
        assert!(text.contains("Audit.java:12:5"));
        assert!(text.contains("`message`"));
    }

    #[test]
    fn lenient_subtype_message_names_the_ancestor() {
        let v = Violation {
            kind: ViolationKind::LenientSubtype {
                subtype: "Token".into(),
                ancestor: "Secret".into(),
            },
            computed: SafetyLevel::Safe,
            required: SafetyLevel::Unsafe,
            location: Location::unknown(),
        };
        assert!(v.message().contains("`Secret`"));
    }

    #[test]
    fn clean_report_has_no_findings() {
        let report = UnitReport::new("A.java");
        assert!(report.is_clean());
        assert_eq!(report.worst_level(), None);
    }

    #[test]
    fn worst_level_is_the_join_of_computed_levels() {
        let mut report = UnitReport::new("A.java");
        for computed in [SafetyLevel::DoNotLog, SafetyLevel::Unsafe] {
            report.violations.push(Violation {
                kind: ViolationKind::SinkFlow(SinkKind::Assignment {
                    target: "x".into(),
                }),
                computed,
                required: SafetyLevel::Safe,
                location: Location::unknown(),
            });
        }
        assert_eq!(report.worst_level(), Some(SafetyLevel::Unsafe));
    }
}
