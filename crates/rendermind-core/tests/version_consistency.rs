//! Ensures all workspace crates use `version.workspace = true` and that
//! the workspace version is consistent across all Cargo.toml files.

use std::path::Path;

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
}

/// Read the workspace version from the root Cargo.toml.
fn workspace_version() -> String {
    let root_toml = std::fs::read_to_string(workspace_root().join("Cargo.toml")).unwrap();
    let doc: toml::Value = root_toml.parse().unwrap();
    doc["workspace"]["package"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

/// `"workspace"` when the crate inherits its version, else the literal.
fn crate_version(manifest_dir: &Path) -> String {
    let toml_str = std::fs::read_to_string(manifest_dir.join("Cargo.toml")).unwrap();
    let doc: toml::Value = toml_str.parse().unwrap();
    let version = &doc["package"]["version"];
    if version.get("workspace").and_then(|v| v.as_bool()) == Some(true) {
        return "workspace".to_string();
    }
    version
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| panic!("no version in {}", manifest_dir.display()))
}

fn members() -> Vec<String> {
    let root_toml = std::fs::read_to_string(workspace_root().join("Cargo.toml")).unwrap();
    let doc: toml::Value = root_toml.parse().unwrap();
    doc["workspace"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m.as_str().map(str::to_string))
        .collect()
}

#[test]
fn all_crates_use_workspace_version() {
    let members = members();
    assert!(!members.is_empty());
    for krate in &members {
        let version = crate_version(&workspace_root().join(krate));
        assert_eq!(
            version, "workspace",
            "{krate} should use version.workspace = true, got {version:?}"
        );
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    assert_eq!(workspace_version(), env!("CARGO_PKG_VERSION"));
    assert_eq!(rendermind_core::VERSION, env!("CARGO_PKG_VERSION"));
}

#[test]
fn internal_dependency_versions_match() {
    let root_toml = std::fs::read_to_string(workspace_root().join("Cargo.toml")).unwrap();
    let doc: toml::Value = root_toml.parse().unwrap();
    let deps = doc["workspace"]["dependencies"].as_table().unwrap();
    for name in ["rendermind-core", "rendermind-bridge"] {
        assert_eq!(deps[name]["version"].as_str().unwrap(), workspace_version());
    }
}
