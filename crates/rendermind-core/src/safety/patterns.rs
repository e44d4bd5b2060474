//! Blocklist table: lexical pattern → threat category.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Broad class of behaviour a blocklisted pattern stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    ProcessSpawn,
    FilesystemRemoval,
    Network,
    DynamicEval,
    FileAccess,
    SessionReset,
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ThreatCategory::ProcessSpawn => "process-spawn",
            ThreatCategory::FilesystemRemoval => "filesystem-removal",
            ThreatCategory::Network => "network",
            ThreatCategory::DynamicEval => "dynamic-eval",
            ThreatCategory::FileAccess => "file-access",
            ThreatCategory::SessionReset => "session-reset",
        };
        write!(f, "{s}")
    }
}

/// One row of the blocklist table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPattern {
    /// Regex source, matched case-insensitively.
    pub pattern: &'static str,
    pub category: ThreatCategory,
}

const fn row(pattern: &'static str, category: ThreatCategory) -> BlockPattern {
    BlockPattern { pattern, category }
}

/// The built-in blocklist.
///
/// | Category           | Patterns                                                  |
/// |--------------------|-----------------------------------------------------------|
/// | process-spawn      | `os.system`, `os.popen`, `subprocess.`                    |
/// | filesystem-removal | `os.remove`, `os.unlink`, `os.rmdir`, `shutil.rmtree`     |
/// | network            | `urllib.request`, `requests.`, `socket.`, `http.`         |
/// | dynamic-eval       | `eval(`, `exec(`, `__import__`, `compile(`                |
/// | file-access        | `open(`, `file(`, `with open`                             |
/// | session-reset      | `wm.open_mainfile`, `wm.read_homefile`                    |
pub const DEFAULT_BLOCKLIST: &[BlockPattern] = &[
    row(r"os\.system", ThreatCategory::ProcessSpawn),
    row(r"os\.popen", ThreatCategory::ProcessSpawn),
    row(r"subprocess\.", ThreatCategory::ProcessSpawn),
    row(r"os\.remove", ThreatCategory::FilesystemRemoval),
    row(r"os\.unlink", ThreatCategory::FilesystemRemoval),
    row(r"os\.rmdir", ThreatCategory::FilesystemRemoval),
    row(r"shutil\.rmtree", ThreatCategory::FilesystemRemoval),
    row(r"urllib\.request", ThreatCategory::Network),
    row(r"requests\.", ThreatCategory::Network),
    row(r"socket\.", ThreatCategory::Network),
    row(r"http\.", ThreatCategory::Network),
    row(r"eval\(", ThreatCategory::DynamicEval),
    row(r"exec\(", ThreatCategory::DynamicEval),
    row(r"__import__", ThreatCategory::DynamicEval),
    row(r"compile\(", ThreatCategory::DynamicEval),
    row(r"open\(", ThreatCategory::FileAccess),
    row(r"file\(", ThreatCategory::FileAccess),
    row(r"with\s+open", ThreatCategory::FileAccess),
    row(r"wm\.open_mainfile", ThreatCategory::SessionReset),
    row(r"wm\.read_homefile", ThreatCategory::SessionReset),
];

/// A compiled blocklist row.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: String,
    pub category: ThreatCategory,
    matcher: Regex,
    /// `pattern` followed by everything up to the closing parenthesis.
    stripper: Regex,
}

impl CompiledPattern {
    fn compile(source: &str, category: ThreatCategory) -> Result<Self, regex::Error> {
        let matcher = RegexBuilder::new(source).case_insensitive(true).build()?;
        let stripper = RegexBuilder::new(&format!(r"{source}[^)]*\)"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            source: source.to_string(),
            category,
            matcher,
            stripper,
        })
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    pub fn stripper(&self) -> &Regex {
        &self.stripper
    }
}

/// Ordered, compiled blocklist. Every row is evaluated; all matches count.
#[derive(Debug, Clone)]
pub struct Blocklist {
    patterns: Vec<CompiledPattern>,
}

impl Blocklist {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// The built-in table from [`DEFAULT_BLOCKLIST`].
    pub fn standard() -> Self {
        let patterns = DEFAULT_BLOCKLIST
            .iter()
            .filter_map(|row| CompiledPattern::compile(row.pattern, row.category).ok())
            .collect();
        Self { patterns }
    }

    /// Append a row and return `self` (builder pattern).
    pub fn with_pattern(
        mut self,
        pattern: &str,
        category: ThreatCategory,
    ) -> Result<Self, regex::Error> {
        self.patterns
            .push(CompiledPattern::compile(pattern, category)?);
        Ok(self)
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::standard()
    }
}
