//! The log-safety lattice.
//!
//! Three levels ordered by restrictiveness: `Safe` values may be logged
//! anywhere, `DoNotLog` values must stay out of logs, `Unsafe` values are
//! the strictest (user- or environment-controlled content). Combining
//! values joins to the most restrictive input.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How permissible it is to record (log) a value.
///
/// The derived `Ord` is the restrictiveness order used for combination
/// and sink admission: `Safe < DoNotLog < Unsafe`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// Permissible in any sink. The default for unannotated values.
    #[default]
    Safe,
    /// Must not be logged, but not attacker-controlled.
    DoNotLog,
    /// Strictest level; may carry user/environment-controlled content.
    Unsafe,
}

impl SafetyLevel {
    /// Numeric restrictiveness (higher = stricter).
    #[inline]
    pub const fn strictness(self) -> u8 {
        match self {
            SafetyLevel::Safe => 0,
            SafetyLevel::DoNotLog => 1,
            SafetyLevel::Unsafe => 2,
        }
    }

    /// Join (least upper bound): the most restrictive of the two.
    #[inline]
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        if self.strictness() >= other.strictness() {
            self
        } else {
            other
        }
    }

    /// Meet (greatest lower bound): the least restrictive of the two.
    #[inline]
    #[must_use]
    pub fn meet(self, other: Self) -> Self {
        if self.strictness() <= other.strictness() {
            self
        } else {
            other
        }
    }

    /// Whether a value at this level may flow into a sink declaring
    /// `required` as its tolerance. `Safe` satisfies every sink; `Unsafe`
    /// only `Unsafe` sinks.
    #[inline]
    pub fn flows_to(self, required: Self) -> bool {
        self.strictness() <= required.strictness()
    }

    /// Bottom of the lattice (most permissive).
    #[inline]
    pub const fn bottom() -> Self {
        SafetyLevel::Safe
    }

    /// Top of the lattice (most restrictive).
    #[inline]
    pub const fn top() -> Self {
        SafetyLevel::Unsafe
    }

    /// Join over any number of levels; `Safe` when empty.
    pub fn join_all(levels: impl IntoIterator<Item = SafetyLevel>) -> Self {
        levels
            .into_iter()
            .fold(SafetyLevel::bottom(), SafetyLevel::join)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyLevel::Safe => write!(f, "SAFE"),
            SafetyLevel::DoNotLog => write!(f, "DO_NOT_LOG"),
            SafetyLevel::Unsafe => write!(f, "UNSAFE"),
        }
    }
}

impl std::str::FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(SafetyLevel::Safe),
            "do_not_log" | "do-not-log" | "donotlog" => Ok(SafetyLevel::DoNotLog),
            "unsafe" => Ok(SafetyLevel::Unsafe),
            _ => Err(format!("unknown safety level: {s}")),
        }
    }
}
