//! Registry of well-known passthrough operations.
//!
//! Library methods the snapshot carries no bodies for still propagate
//! sensitivity: `checkNotNull` returns its argument, `Optional::orElse`
//! returns one of its two operands, a builder `append` folds its
//! argument into the receiver. The registry maps method names to a
//! propagation kind; anything unknown without a body defaults to `Safe`.
//!
//! Throwable message accessors are listed here too: their receivers
//! classify at least `Unsafe` (unless the throwable type is annotated),
//! and joining the receiver carries that level through the accessor.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a pattern is matched against a method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact name match.
    Exact,
    /// Name starts with the pattern.
    Prefix,
    /// Name ends with the pattern.
    Suffix,
    /// Regex match over the whole name.
    Regex,
}

/// How a matched operation propagates its operands' levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughKind {
    /// Result is the join of receiver and argument levels.
    Identity,
    /// Like `Identity`, and additionally folds the argument levels into
    /// the receiver's accumulated state for the rest of the body
    /// (builder `append`, collection `add`).
    Accumulate,
}

/// A user-extensible passthrough pattern, as it appears in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassthroughPattern {
    pub pattern: String,
    #[serde(default = "default_strategy")]
    pub strategy: MatchStrategy,
    #[serde(default = "default_kind")]
    pub kind: PassthroughKind,
}

fn default_strategy() -> MatchStrategy {
    MatchStrategy::Exact
}

fn default_kind() -> PassthroughKind {
    PassthroughKind::Identity
}

/// A compiled passthrough operation.
#[derive(Debug, Clone)]
pub struct PassthroughOp {
    pattern: String,
    strategy: MatchStrategy,
    kind: PassthroughKind,
    compiled: Option<Regex>,
}

impl PassthroughOp {
    fn exact(pattern: &str, kind: PassthroughKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            strategy: MatchStrategy::Exact,
            kind,
            compiled: None,
        }
    }

    fn prefix(pattern: &str, kind: PassthroughKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            strategy: MatchStrategy::Prefix,
            kind,
            compiled: None,
        }
    }

    fn suffix(pattern: &str, kind: PassthroughKind) -> Self {
        Self {
            pattern: pattern.to_string(),
            strategy: MatchStrategy::Suffix,
            kind,
            compiled: None,
        }
    }

    /// Compile a user pattern. Regex patterns that fail to compile are
    /// rejected here rather than silently never matching.
    pub fn from_pattern(p: &PassthroughPattern) -> Result<Self, regex::Error> {
        let compiled = match p.strategy {
            MatchStrategy::Regex => Some(Regex::new(&p.pattern)?),
            _ => None,
        };
        Ok(Self {
            pattern: p.pattern.clone(),
            strategy: p.strategy,
            kind: p.kind,
            compiled,
        })
    }

    /// Check whether a method name matches this operation.
    pub fn matches(&self, name: &str) -> bool {
        match self.strategy {
            MatchStrategy::Exact => name == self.pattern,
            MatchStrategy::Prefix => name.starts_with(&self.pattern),
            MatchStrategy::Suffix => name.ends_with(&self.pattern),
            MatchStrategy::Regex => self
                .compiled
                .as_ref()
                .is_some_and(|regex| regex.is_match(name)),
        }
    }

    pub fn kind(&self) -> PassthroughKind {
        self.kind
    }
}

/// Built-in operations: identity wrappers, optional/stream plumbing,
/// boxing/unboxing, getters, throwable accessors, and accumulating
/// builder/collection writes.
static BUILTIN_OPS: Lazy<Vec<PassthroughOp>> = Lazy::new(|| {
    use PassthroughKind::{Accumulate, Identity};
    vec![
        // Precondition-style identity wrappers
        PassthroughOp::exact("checkNotNull", Identity),
        PassthroughOp::exact("requireNonNull", Identity),
        PassthroughOp::exact("verifyNotNull", Identity),
        // Optional / stream plumbing
        PassthroughOp::exact("get", Identity),
        PassthroughOp::exact("orElse", Identity),
        PassthroughOp::exact("orElseGet", Identity),
        PassthroughOp::exact("orElseThrow", Identity),
        PassthroughOp::exact("map", Identity),
        PassthroughOp::exact("flatMap", Identity),
        PassthroughOp::exact("filter", Identity),
        PassthroughOp::exact("ofNullable", Identity),
        PassthroughOp::exact("of", Identity),
        // Boxing/unboxing preserves the underlying value's level
        PassthroughOp::exact("valueOf", Identity),
        PassthroughOp::suffix("Value", Identity),
        // Getters and rendering
        PassthroughOp::prefix("get", Identity),
        PassthroughOp::exact("toString", Identity),
        // Throwable accessors; the receiver's floor carries through
        PassthroughOp::exact("getMessage", Identity),
        PassthroughOp::exact("getLocalizedMessage", Identity),
        PassthroughOp::exact("getStackTrace", Identity),
        PassthroughOp::exact("getCause", Identity),
        // Builder / collection accumulation
        PassthroughOp::exact("append", Accumulate),
        PassthroughOp::exact("add", Accumulate),
        PassthroughOp::exact("addAll", Accumulate),
        PassthroughOp::exact("put", Accumulate),
        PassthroughOp::exact("push", Accumulate),
        PassthroughOp::exact("insert", Accumulate),
    ]
});

/// The passthrough lookup table used by a classifier instance:
/// built-ins plus any user-configured patterns.
#[derive(Debug, Clone, Default)]
pub struct PassthroughRegistry {
    extra: Vec<PassthroughOp>,
}

impl PassthroughRegistry {
    /// Built-ins only.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Built-ins plus user patterns. Fails on an invalid regex pattern.
    pub fn with_patterns(patterns: &[PassthroughPattern]) -> Result<Self, regex::Error> {
        let extra = patterns
            .iter()
            .map(PassthroughOp::from_pattern)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    /// Propagation kind for a method name, if any. User patterns win
    /// over built-ins so a config can widen a built-in to `Accumulate`.
    pub fn lookup(&self, name: &str) -> Option<PassthroughKind> {
        self.extra
            .iter()
            .chain(BUILTIN_OPS.iter())
            .find(|op| op.matches(name))
            .map(PassthroughOp::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_the_usual_suspects() {
        let registry = PassthroughRegistry::builtin();
        assert_eq!(
            registry.lookup("checkNotNull"),
            Some(PassthroughKind::Identity)
        );
        assert_eq!(registry.lookup("orElse"), Some(PassthroughKind::Identity));
        assert_eq!(registry.lookup("append"), Some(PassthroughKind::Accumulate));
        assert_eq!(registry.lookup("execute"), None);
    }

    #[test]
    fn getter_prefix_matches_but_setters_do_not() {
        let registry = PassthroughRegistry::builtin();
        assert_eq!(
            registry.lookup("getToken"),
            Some(PassthroughKind::Identity)
        );
        assert_eq!(registry.lookup("setToken"), None);
    }

    #[test]
    fn unboxing_suffix_matches() {
        let registry = PassthroughRegistry::builtin();
        assert_eq!(registry.lookup("intValue"), Some(PassthroughKind::Identity));
        assert_eq!(
            registry.lookup("doubleValue"),
            Some(PassthroughKind::Identity)
        );
    }

    #[test]
    fn user_patterns_extend_and_override() {
        let patterns = vec![
            PassthroughPattern {
                pattern: "wrap".into(),
                strategy: MatchStrategy::Exact,
                kind: PassthroughKind::Identity,
            },
            PassthroughPattern {
                pattern: "get".into(),
                strategy: MatchStrategy::Exact,
                kind: PassthroughKind::Accumulate,
            },
        ];
        let registry = PassthroughRegistry::with_patterns(&patterns).unwrap();
        assert_eq!(registry.lookup("wrap"), Some(PassthroughKind::Identity));
        // User pattern wins over the built-in `get`.
        assert_eq!(registry.lookup("get"), Some(PassthroughKind::Accumulate));
    }

    #[test]
    fn regex_patterns_compile_or_fail_loudly() {
        let good = vec![PassthroughPattern {
            pattern: "^unwrap[A-Z]".into(),
            strategy: MatchStrategy::Regex,
            kind: PassthroughKind::Identity,
        }];
        let registry = PassthroughRegistry::with_patterns(&good).unwrap();
        assert_eq!(
            registry.lookup("unwrapToken"),
            Some(PassthroughKind::Identity)
        );
        assert_eq!(registry.lookup("unwrap"), None);

        let bad = vec![PassthroughPattern {
            pattern: "(".into(),
            strategy: MatchStrategy::Regex,
            kind: PassthroughKind::Identity,
        }];
        assert!(PassthroughRegistry::with_patterns(&bad).is_err());
    }
}
