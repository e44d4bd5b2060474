//! Import statement scanning and the module allowlist.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Modules a script may import.
pub const DEFAULT_ALLOWED_MODULES: &[&str] =
    &["bpy", "bmesh", "mathutils", "math", "random", "datetime"];

/// Set of importable top-level module names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAllowlist {
    modules: BTreeSet<String>,
}

impl ImportAllowlist {
    pub fn standard() -> Self {
        Self {
            modules: DEFAULT_ALLOWED_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.modules.insert(module.into());
        self
    }

    pub fn allows(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }
}

impl Default for ImportAllowlist {
    fn default() -> Self {
        Self::standard()
    }
}

/// An `import` statement found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// First dotted segment of the imported path, or the whole expression
    /// when it is not a plain module literal.
    pub module: String,
    /// Full path or expression as written, without quotes.
    pub path: String,
    /// True only for a quoted dotted module name such as `"bpy.ops"`.
    pub literal: bool,
    pub offset: usize,
}

fn import_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        // Statement-anchored so identifiers like `reimport` are not picked up.
        // The Rhai form takes everything up to the next `;`, alias included.
        Regex::new(
            r#"(?m)(?:^|[;{}])\s*(?:from\s+"?(?P<from>\w[\w.]*)"?\s+import\b|import\s+(?P<import>[^;]+))"#,
        )
        .ok()
    })
    .as_ref()
}

fn module_literal() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^"(\w+(?:\.\w+)*)"$"#).ok())
        .as_ref()
}

fn alias_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+as\s+\w+\s*$").ok()).as_ref()
}

fn classify(expr: &str, offset: usize) -> ImportRef {
    let expr = match alias_suffix().and_then(|re| re.find(expr)) {
        Some(alias) => &expr[..alias.start()],
        None => expr,
    };
    let expr = expr.trim();
    let literal = module_literal().and_then(|re| re.captures(expr)).and_then(|c| c.get(1));
    match literal {
        Some(path) => ImportRef {
            module: path.as_str().split('.').next().unwrap_or_default().to_string(),
            path: path.as_str().to_string(),
            literal: true,
            offset,
        },
        None => ImportRef {
            module: expr.to_string(),
            path: expr.to_string(),
            literal: false,
            offset,
        },
    }
}

/// Every import statement in `script`, in source order.
pub fn scan_imports(script: &str) -> Vec<ImportRef> {
    let Some(re) = import_regex() else {
        return Vec::new();
    };
    re.captures_iter(script)
        .filter_map(|caps| {
            if let Some(m) = caps.name("from") {
                let path = m.as_str().to_string();
                let module = path.split('.').next().unwrap_or_default().to_string();
                return Some(ImportRef {
                    module,
                    path,
                    literal: true,
                    offset: m.start(),
                });
            }
            caps.name("import").map(|m| classify(m.as_str(), m.start()))
        })
        .collect()
}
