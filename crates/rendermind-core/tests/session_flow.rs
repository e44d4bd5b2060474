//! End-to-end session flow with scripted backends.

use std::sync::Arc;

use async_trait::async_trait;
use rendermind_core::gateway::{DemoBackend, GenerationRequest};
use rendermind_core::{
    AssetLibrary, BackendError, CodeGenerationGateway, ConversationLog, ExecutionEngine,
    GenerationBackend, InstructionPipeline, MemoryHost, Role, Session, TurnStatus,
};

struct Scripted(&'static str);

#[async_trait]
impl GenerationBackend for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }
}

fn session() -> Session {
    Session::new(ExecutionEngine::standard(), Box::new(MemoryHost::new()))
}

fn pipeline(reply: &'static str) -> InstructionPipeline {
    InstructionPipeline::new(CodeGenerationGateway::new(Arc::new(Scripted(reply))))
}

#[tokio::test]
async fn generated_script_runs_and_succeeds() {
    let mut s = session();
    let p = pipeline(
        "Sure!\n```rhai\nfn rendermind_action(context) {\n    let o = context.add_uv_sphere();\n    context.rename(o, \"Ball\");\n}\n```",
    );
    let idx = s.submit(&p, "add a ball").await.unwrap();

    assert_eq!(s.log().len(), 2);
    assert_eq!(s.log().get(0).unwrap().role(), Role::User);
    let turn = s.log().get(idx).unwrap();
    assert_eq!(turn.content(), "Sure!");
    assert_eq!(turn.status(), TurnStatus::Success);
    assert!(s.scene_summary().objects.contains(&"Ball".to_string()));
    assert!(!s.is_thinking());
}

#[tokio::test]
async fn unsafe_generated_script_is_an_error_turn() {
    let mut s = session();
    let before = s.scene_summary();
    let p = pipeline("```\nfn rendermind_action(context) { let x = \"os.system\"; }\n```");
    let idx = s.submit(&p, "do something").await.unwrap();

    let turn = s.log().get(idx).unwrap();
    assert_eq!(turn.status(), TurnStatus::Error);
    assert!(turn.error().unwrap().starts_with("unsafe script"));
    assert_eq!(s.scene_summary(), before);
}

#[tokio::test]
async fn asset_shortcut_imports_without_generation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("vase_01.blend"), b"").unwrap();
    let mut s = session();
    let p = pipeline("never used").with_assets(AssetLibrary::new(dir.path()));

    let idx = s.submit(&p, "vase").await.unwrap();
    let turn = s.log().get(idx).unwrap();
    assert_eq!(turn.content(), "I'll create that for you! Here's the code:");
    assert_eq!(turn.status(), TurnStatus::Success);
    assert!(s.scene_summary().objects.iter().any(|n| n.starts_with("vase")));
}

#[tokio::test]
async fn demo_provider_works_offline() {
    let mut s = session();
    let p = InstructionPipeline::new(CodeGenerationGateway::new(Arc::new(DemoBackend)));
    let idx = s.submit(&p, "a cylinder").await.unwrap();
    assert_eq!(s.log().get(idx).unwrap().status(), TurnStatus::Success);
    assert!(s
        .scene_summary()
        .objects
        .contains(&"RenderMind_Cylinder".to_string()));
}

#[tokio::test]
async fn empty_instruction_adds_no_turn() {
    let mut s = session();
    assert!(s.submit(&pipeline("x"), "  ").await.is_err());
    assert!(s.log().is_empty());
}

#[tokio::test]
async fn log_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    let mut s = session();
    s.submit(&pipeline("fn rendermind_action(context) {}"), "noop")
        .await
        .unwrap();
    s.save_log(&path).unwrap();

    let mut restored = session();
    restored.load_log(&path).unwrap();
    assert_eq!(restored.log(), s.log());
    assert_eq!(ConversationLog::load(&path).unwrap().len(), 2);

    restored.clear();
    assert!(restored.log().is_empty());
}
