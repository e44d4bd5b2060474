//! Safety filter behaviour over the built-in blocklist and allowlist.

use rendermind_core::safety::{ThreatCategory, DEFAULT_BLOCKLIST};
use rendermind_core::{SafetyFilter, ViolationKind};

/// One literal per blocklist row that the row must catch.
const SAMPLES: &[(&str, ThreatCategory)] = &[
    ("os.system", ThreatCategory::ProcessSpawn),
    ("os.popen", ThreatCategory::ProcessSpawn),
    ("subprocess.run", ThreatCategory::ProcessSpawn),
    ("os.remove", ThreatCategory::FilesystemRemoval),
    ("os.unlink", ThreatCategory::FilesystemRemoval),
    ("os.rmdir", ThreatCategory::FilesystemRemoval),
    ("shutil.rmtree", ThreatCategory::FilesystemRemoval),
    ("urllib.request", ThreatCategory::Network),
    ("requests.get", ThreatCategory::Network),
    ("socket.socket", ThreatCategory::Network),
    ("http.client", ThreatCategory::Network),
    ("eval(x)", ThreatCategory::DynamicEval),
    ("exec(x)", ThreatCategory::DynamicEval),
    ("__import__", ThreatCategory::DynamicEval),
    ("compile(x)", ThreatCategory::DynamicEval),
    ("open(x)", ThreatCategory::FileAccess),
    ("file(x)", ThreatCategory::FileAccess),
    ("with  open", ThreatCategory::FileAccess),
    ("wm.open_mainfile", ThreatCategory::SessionReset),
    ("wm.read_homefile", ThreatCategory::SessionReset),
];

fn wrap(body: &str) -> String {
    format!("fn rendermind_action(context) {{\n    {body}\n}}\n")
}

#[test]
fn every_blocklist_row_has_a_sample() {
    assert_eq!(SAMPLES.len(), DEFAULT_BLOCKLIST.len());
}

#[test]
fn each_blocked_literal_is_rejected_with_its_category() {
    let filter = SafetyFilter::standard();
    for (literal, category) in SAMPLES {
        let script = wrap(&format!("let s = \"{literal}\";"));
        let verdict = filter.validate(&script);
        assert!(!verdict.is_safe, "{literal} slipped through");
        assert!(
            verdict
                .violations
                .iter()
                .any(|v| v.kind == ViolationKind::Pattern(*category)),
            "{literal} not reported as {category}"
        );
    }
}

#[test]
fn matching_is_case_insensitive() {
    let verdict = SafetyFilter::standard().validate(&wrap("let s = \"OS.SYSTEM\";"));
    assert!(!verdict.is_safe);
}

#[test]
fn clean_script_passes() {
    let script = wrap(
        "let obj = context.add_cube(#{ size: 1.0 });\n    context.rename(obj, \"Crate\");",
    );
    let verdict = SafetyFilter::standard().validate(&script);
    assert!(verdict.is_safe, "{:?}", verdict.violations);
}

#[test]
fn allowed_and_forbidden_imports() {
    let filter = SafetyFilter::standard();
    let ok = "import \"math\" as m;\nfn rendermind_action(context) { let x = m::PI; }\n";
    assert!(filter.validate(ok).is_safe);

    let bad = "import \"os\" as o;\nfn rendermind_action(context) {}\n";
    let verdict = filter.validate(bad);
    assert!(!verdict.is_safe);
    assert!(verdict
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::Import && v.matched == "os"));

    let host_api = "import \"bmesh\" as bm;\nfn rendermind_action(context) {}\n";
    assert!(filter.validate(host_api).is_safe);

    // Only a quoted module name can pass; paths and computed names cannot.
    for header in ["import \"/tmp/evil\" as e;", "import (\"o\" + \"s\") as e;"] {
        let script = format!("{header}\nfn rendermind_action(context) {{}}\n");
        let verdict = filter.validate(&script);
        assert!(!verdict.is_safe, "{script}");
        assert!(verdict
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::Import && v.offset == 7));
    }
}

#[test]
fn syntax_errors_are_violations() {
    let verdict = SafetyFilter::standard().validate("fn rendermind_action(context) {");
    assert!(!verdict.is_safe);
    assert!(verdict.has_syntax_error());
}

#[test]
fn violations_are_ordered_by_offset() {
    let script = wrap("let a = \"http.x\";\n    let b = \"os.system\";");
    let verdict = SafetyFilter::standard().validate(&script);
    let offsets: Vec<_> = verdict.violations.iter().map(|v| v.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort();
    assert_eq!(offsets, sorted);
    assert!(verdict.violations.len() >= 2);
}

#[test]
fn concatenated_names_are_not_detected() {
    // Lexical matching only: assembling a name at runtime is not caught.
    let script = wrap("let s = \"os.sys\" + \"tem\";");
    assert!(SafetyFilter::standard().validate(&script).is_safe);
}

#[test]
fn sanitize_strips_calls_and_reports() {
    let filter = SafetyFilter::standard();
    let out = filter.sanitize("let x = eval(1 + 2);\nlet y = 3;");
    assert_eq!(out.warnings, vec![r"Removed dangerous pattern: eval\(".to_string()]);
    assert!(!out.text.contains("eval("));
    assert!(out.text.contains("let y = 3;"));
}

#[test]
fn sanitize_is_advisory() {
    let filter = SafetyFilter::standard();
    let out = filter.sanitize(&wrap("let s = \"os.system\";"));
    assert!(!out.warnings.is_empty());
    // The stripped text is still rejected and must be validated again.
    assert!(!filter.validate(&out.text).is_safe);
}
