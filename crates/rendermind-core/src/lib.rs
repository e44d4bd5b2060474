//! RenderMind Core Library
//!
//! Natural-language scene editing: instructions become scripts, scripts are
//! screened by the safety filter, and only then run against the host scene.

pub mod assets;
pub mod config;
pub mod domain;
pub mod emitter;
pub mod engine;
pub mod gateway;
pub mod history;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod safety;
pub mod scene;
pub mod session;
pub mod telemetry;

/// Crate version, also exposed to scripts as `bpy::api_version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use domain::{
    quote_literal, ConversationTurn, GeneratedScript, PipelineError, Result, Role, ScriptOrigin,
    TurnError, TurnStatus, ENTRY_POINT,
};

pub use safety::{
    ImportAllowlist, Sanitized, SafetyFilter, SafetyVerdict, Violation, ViolationKind,
    DEFAULT_BLOCKLIST,
};

pub use assets::{build_import_script, AssetError, AssetFormat, AssetLibrary, AssetRecord, MatchConfig};

pub use gateway::{
    BackendError, CodeGenerationGateway, GenerationBackend, GenerationOutput, Transcriber,
};

pub use emitter::emit;

pub use engine::{ExecutionEngine, ExecutionError, ExecutionLimits, ExecutionReport, PreviewArtifact};

pub use scene::{MemoryHost, MemoryScene, SceneHandle, SceneHost, SceneSummary, SharedScene};

pub use history::{ConversationLog, HistoryItem, PlanHistory, Variant};

pub use pipeline::{Candidate, CandidateSource, InstructionPipeline};

pub use session::{PendingInstruction, QuickAction, Session};

pub use config::{Provider, Settings, UiSettings};
