//! Execution engine against the in-memory scene.

use std::cell::RefCell;
use std::rc::Rc;

use rendermind_core::{
    build_import_script, emit, AssetLibrary, ExecutionEngine, ExecutionError, ExecutionLimits,
    MemoryScene, SafetyFilter, SceneHandle, SharedScene,
};

fn scene() -> (Rc<RefCell<MemoryScene>>, SharedScene) {
    let concrete = Rc::new(RefCell::new(MemoryScene::with_default_cube("Scene")));
    let shared: SharedScene = concrete.clone();
    (concrete, shared)
}

#[test]
fn unsafe_script_never_touches_the_scene() {
    let (concrete, shared) = scene();
    let before = concrete.borrow().summary();
    let src = r#"
fn rendermind_action(context) {
    context.remove_object("Cube");
    let s = "os.system";
}
"#;
    let err = ExecutionEngine::standard().run_source(src, shared).unwrap_err();
    assert!(matches!(err, ExecutionError::Unsafe(ref v) if !v.is_empty()));
    assert!(!err.reached_scene());
    assert_eq!(concrete.borrow().summary(), before);
}

#[test]
fn contract_violations_are_reported() {
    let engine = ExecutionEngine::standard();
    let cases = [
        "fn other(context) {}",
        "fn rendermind_action() {}",
        "fn rendermind_action(a, b) {}",
        "fn rendermind_action(c) {}\nfn rendermind_action(c) {}",
    ];
    for src in cases {
        let (_, shared) = scene();
        let err = engine.run_source(src, shared).unwrap_err();
        assert!(
            matches!(err, ExecutionError::Contract(_) | ExecutionError::Unsafe(_)),
            "{src}: {err:?}"
        );
    }
}

#[test]
fn top_level_statements_never_run() {
    let (concrete, shared) = scene();
    let before = concrete.borrow().summary();
    let src = r#"
print("top-level ran");
fn rendermind_action(context) { context.log("entry"); }
"#;
    let err = ExecutionEngine::standard().run_source(src, shared).unwrap_err();
    assert!(matches!(err, ExecutionError::Contract(ref msg) if msg.contains("line 2")), "{err:?}");
    assert_eq!(concrete.borrow().summary(), before);
}

#[test]
fn top_level_import_is_visible_to_the_entry_point() {
    let (concrete, shared) = scene();
    let src = r#"
import "math" as m;
fn rendermind_action(context) {
    let obj = context.add_uv_sphere(#{ radius: m::clamp(5.0, 0.1, 2.0) });
    context.rename(obj, "Hoisted");
}
"#;
    ExecutionEngine::standard().run_source(src, shared).unwrap();
    assert!(concrete.borrow().object("Hoisted").is_some());
}

#[test]
fn runaway_loop_hits_the_operation_limit() {
    let limits = ExecutionLimits {
        max_operations: 1_000,
        ..ExecutionLimits::default()
    };
    let engine = ExecutionEngine::new(SafetyFilter::standard(), limits);
    let (_, shared) = scene();
    let err = engine
        .run_source("fn rendermind_action(context) { loop { } }", shared)
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Runtime(_)));
}

#[test]
fn eval_symbol_is_disabled() {
    let filter = SafetyFilter::new(
        rendermind_core::safety::Blocklist::empty(),
        rendermind_core::ImportAllowlist::standard(),
    );
    let engine = ExecutionEngine::new(filter, ExecutionLimits::default());
    let (_, shared) = scene();
    let err = engine
        .run_source("fn rendermind_action(context) { eval(\"1\"); }", shared)
        .unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Contract(_) | ExecutionError::Runtime(_) | ExecutionError::Unsafe(_)
    ));
}

#[test]
fn print_and_log_are_captured() {
    let (_, shared) = scene();
    let report = ExecutionEngine::standard()
        .run_source(
            "fn rendermind_action(context) { print(\"hello\"); context.log(\"world\"); }",
            shared,
        )
        .unwrap();
    assert_eq!(report.log, vec!["hello".to_string(), "world".to_string()]);
    assert_eq!(report.digest.len(), 12);
}

#[test]
fn imports_resolve_from_the_static_table() {
    let (concrete, shared) = scene();
    let src = r#"
fn rendermind_action(context) {
    import "math" as m;
    let obj = context.add_uv_sphere(#{ radius: m::clamp(5.0, 0.1, 2.0) });
    context.rename(obj, "Clamped");
}
"#;
    ExecutionEngine::standard().run_source(src, shared).unwrap();
    assert!(concrete.borrow().object("Clamped").is_some());
}

#[test]
fn emitted_plans_run_cleanly() {
    for (plan, object, material) in [
        ("uv_sphere r=0.75", "rm_sphere", "rm_mat"),
        ("cylinder vase", "rm_cylinder", "rm_ceramic"),
        ("a box", "rm_cube", "rm_matte"),
    ] {
        let (concrete, shared) = scene();
        ExecutionEngine::standard().run(&emit(plan), shared).unwrap();
        let scene = concrete.borrow();
        assert!(scene.object(object).is_some(), "{plan}");
        assert!(scene.material(material).is_some(), "{plan}");
    }
}

#[test]
fn placeholder_plan_only_logs() {
    let (concrete, shared) = scene();
    let before = concrete.borrow().summary();
    let report = ExecutionEngine::standard().run(&emit("teapot"), shared).unwrap();
    assert_eq!(report.log, vec!["Plan not implemented".to_string()]);
    assert_eq!(concrete.borrow().summary(), before);
}

#[test]
fn asset_import_script_imports_into_the_scene() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("chair_4k.obj"), b"").unwrap();
    let record = AssetLibrary::new(dir.path()).best_match("chair").unwrap();
    let script = build_import_script(&record, "chair").unwrap();

    let (concrete, shared) = scene();
    let report = ExecutionEngine::standard().run(&script, shared).unwrap();
    assert!(concrete.borrow().object_names().iter().any(|n| n.starts_with("chair")));
    assert!(report.log.iter().any(|l| l.starts_with("Imported 1 object(s)")));
}
