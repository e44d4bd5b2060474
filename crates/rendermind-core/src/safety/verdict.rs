//! Validation outcome types.

use serde::{Deserialize, Serialize};

use super::patterns::ThreatCategory;

/// Which check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Blocklisted lexical pattern.
    Pattern(ThreatCategory),
    /// Import of a module outside the allowlist.
    Import,
    /// Script failed to parse.
    Syntax,
}

/// One finding from [`SafetyFilter::validate`](super::SafetyFilter::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Blocklist regex, module name, or parser message.
    pub pattern: String,
    /// Text that triggered the violation.
    pub matched: String,
    /// Byte offset into the script.
    pub offset: usize,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ViolationKind::Pattern(category) => write!(
                f,
                "blocked {} pattern '{}' at offset {}",
                category, self.matched, self.offset
            ),
            ViolationKind::Import => write!(
                f,
                "import of '{}' is not allowed (offset {})",
                self.matched, self.offset
            ),
            ViolationKind::Syntax => {
                write!(f, "syntax error at offset {}: {}", self.offset, self.pattern)
            }
        }
    }
}

/// Outcome of lexical validation. Computed per call, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub violations: Vec<Violation>,
}

impl SafetyVerdict {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            is_safe: violations.is_empty(),
            violations,
        }
    }

    /// Violations produced by the blocklist only.
    pub fn pattern_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::Pattern(_)))
    }

    pub fn has_syntax_error(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.kind == ViolationKind::Syntax)
    }
}
