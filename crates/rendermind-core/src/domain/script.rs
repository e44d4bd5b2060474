//! Generated scripts and the entry-point contract shared by every producer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Name of the single entry point every script must define.
///
/// The entry point takes exactly one `context` argument and returns nothing.
pub const ENTRY_POINT: &str = "rendermind_action";

/// Which component produced a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptOrigin {
    /// Returned by a generation backend.
    Generated,
    /// Deterministic import of a library asset.
    AssetImport,
    /// Compiled from a keyword plan.
    Emitter,
    /// Canned script from the offline demo provider.
    Demo,
    /// Submitted verbatim by the user or an external UI.
    User,
}

impl std::fmt::Display for ScriptOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptOrigin::Generated => write!(f, "generated"),
            ScriptOrigin::AssetImport => write!(f, "asset_import"),
            ScriptOrigin::Emitter => write!(f, "emitter"),
            ScriptOrigin::Demo => write!(f, "demo"),
            ScriptOrigin::User => write!(f, "user"),
        }
    }
}

/// An executable artifact exposing the `rendermind_action(context)` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub source: String,
    pub origin: ScriptOrigin,
}

impl GeneratedScript {
    pub fn new(source: impl Into<String>, origin: ScriptOrigin) -> Self {
        Self {
            source: source.into(),
            origin,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// SHA-256 of the source text, hex encoded.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// First 12 hex characters of [`GeneratedScript::digest`], for log lines.
    pub fn short_digest(&self) -> String {
        let mut digest = self.digest();
        digest.truncate(12);
        digest
    }
}

/// Render `value` as a double-quoted script string literal.
///
/// Backslashes, quotes and control characters are escaped so that text
/// spliced into a template can never terminate the literal early.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
