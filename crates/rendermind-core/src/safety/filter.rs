//! `SafetyFilter`: blocklist, import allowlist, then syntax.

use tracing::debug;

use super::imports::{scan_imports, ImportAllowlist};
use super::patterns::Blocklist;
use super::verdict::{SafetyVerdict, Violation, ViolationKind};

/// Output of [`SafetyFilter::sanitize`]. Advisory only: re-validate before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Lexical validator for candidate scripts.
#[derive(Debug, Clone, Default)]
pub struct SafetyFilter {
    blocklist: Blocklist,
    allowlist: ImportAllowlist,
}

impl SafetyFilter {
    pub fn new(blocklist: Blocklist, allowlist: ImportAllowlist) -> Self {
        Self {
            blocklist,
            allowlist,
        }
    }

    /// Built-in blocklist and allowlist.
    pub fn standard() -> Self {
        Self::new(Blocklist::standard(), ImportAllowlist::standard())
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn allowlist(&self) -> &ImportAllowlist {
        &self.allowlist
    }

    /// Run every check and collect all violations.
    pub fn validate(&self, script: &str) -> SafetyVerdict {
        let mut violations = self.check_patterns(script);
        violations.extend(self.check_imports(script));
        violations.extend(check_syntax(script));
        violations.sort_by_key(|v| v.offset);

        let verdict = SafetyVerdict::from_violations(violations);
        debug!(
            safe = verdict.is_safe,
            violations = verdict.violations.len(),
            "script validated"
        );
        verdict
    }

    fn check_patterns(&self, script: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        for row in self.blocklist.patterns() {
            for m in row.matcher().find_iter(script) {
                out.push(Violation {
                    kind: ViolationKind::Pattern(row.category),
                    pattern: row.source.clone(),
                    matched: m.as_str().to_string(),
                    offset: m.start(),
                });
            }
        }
        out
    }

    fn check_imports(&self, script: &str) -> Vec<Violation> {
        scan_imports(script)
            .into_iter()
            .filter(|import| !import.literal || !self.allowlist.allows(&import.module))
            .map(|import| Violation {
                kind: ViolationKind::Import,
                pattern: import.path,
                matched: import.module,
                offset: import.offset,
            })
            .collect()
    }

    /// Best-effort removal of blocklisted calls.
    ///
    /// The result may still be unsafe or fail to parse; callers must run
    /// [`validate`](Self::validate) on it again.
    pub fn sanitize(&self, script: &str) -> Sanitized {
        let mut text = script.to_string();
        let mut warnings = Vec::new();
        for row in self.blocklist.patterns() {
            if row.matcher().is_match(&text) {
                warnings.push(format!("Removed dangerous pattern: {}", row.source));
                text = row.stripper().replace_all(&text, "").into_owned();
            }
        }
        Sanitized { text, warnings }
    }
}

fn check_syntax(script: &str) -> Option<Violation> {
    let engine = rhai::Engine::new_raw();
    let err = engine.compile(script).err()?;
    let pos = err.position();
    Some(Violation {
        kind: ViolationKind::Syntax,
        pattern: err.err_type().to_string(),
        matched: pos
            .line()
            .and_then(|line| script.lines().nth(line.saturating_sub(1)))
            .unwrap_or_default()
            .trim()
            .to_string(),
        offset: byte_offset(script, pos.line(), pos.position()),
    })
}

/// Convert a 1-based (line, column) pair into a byte offset.
fn byte_offset(script: &str, line: Option<usize>, column: Option<usize>) -> usize {
    let Some(line) = line else {
        return script.len();
    };
    let mut offset = 0;
    for (idx, text) in script.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let col = column.unwrap_or(1).saturating_sub(1);
            return offset
                + text
                    .char_indices()
                    .nth(col)
                    .map(|(i, _)| i)
                    .unwrap_or(text.len());
        }
        offset += text.len();
    }
    script.len()
}
