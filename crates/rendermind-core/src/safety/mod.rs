//! Safety filter: lexical screening of scripts before they touch a scene.
//!
//! Three checks run in order and every finding is collected:
//!
//! - [`patterns`]: data-driven blocklist (`pattern → ThreatCategory`)
//! - [`imports`]: module allowlist for `import` statements
//! - [`filter`]: `SafetyFilter::validate()` plus the Rhai syntax check
//! - [`verdict`]: `SafetyVerdict` / `Violation`
//!
//! This is a best-effort denylist, not a capability sandbox. Obfuscated
//! equivalents of blocked calls are not detected; the script engine's own
//! restrictions (no filesystem module resolver, `eval` disabled) are the
//! second layer.

pub mod filter;
pub mod imports;
pub mod patterns;
pub mod verdict;

pub use filter::{Sanitized, SafetyFilter};
pub use imports::{ImportAllowlist, DEFAULT_ALLOWED_MODULES};
pub use patterns::{BlockPattern, Blocklist, ThreatCategory, DEFAULT_BLOCKLIST};
pub use verdict::{SafetyVerdict, Violation, ViolationKind};
