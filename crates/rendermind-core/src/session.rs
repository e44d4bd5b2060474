//! Conversation session bound to one scene host.
//!
//! A `Session` lives on the main context: it owns the host and runs scripts
//! against it. Work that may leave the main context (asset search, backend
//! calls) goes through [`InstructionPipeline`], and its result is handed
//! back via [`Session::complete_turn`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::domain::{ConversationTurn, GeneratedScript, PipelineError, Result, ScriptOrigin, TurnError};
use crate::emitter;
use crate::engine::{ExecutionEngine, ExecutionError, ExecutionReport, PreviewArtifact};
use crate::history::{ConversationLog, PlanHistory, Variant};
use crate::metrics::METRICS;
use crate::obs;
use crate::pipeline::{Candidate, InstructionPipeline};
use crate::scene::{SceneHost, SceneSummary};

/// Longest instruction accepted from a UI, in characters.
pub const MAX_INSTRUCTION_CHARS: usize = 4096;

/// Content of the assistant turn created when code is run again.
pub const RERUN_MESSAGE: &str = "Running the code again:";

/// Canned instruction prefixes offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Create,
    Modify,
    Material,
}

impl QuickAction {
    pub fn template(self) -> &'static str {
        match self {
            QuickAction::Create => "Create a ",
            QuickAction::Modify => "Modify the selected object to ",
            QuickAction::Material => "Add a material that ",
        }
    }
}

impl FromStr for QuickAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Ok(QuickAction::Create),
            "MODIFY" => Ok(QuickAction::Modify),
            "MATERIAL" => Ok(QuickAction::Material),
            other => Err(format!("unknown quick action: {other}")),
        }
    }
}

/// A user instruction accepted into the log, awaiting a candidate.
#[derive(Debug, Clone)]
pub struct PendingInstruction {
    pub instruction: String,
    pub scene: SceneSummary,
    pub turn_index: usize,
}

pub struct Session {
    log: ConversationLog,
    plans: PlanHistory,
    variants: Vec<Variant>,
    engine: ExecutionEngine,
    host: Box<dyn SceneHost>,
    auto_execute: bool,
    thinking: bool,
    preview_dir: PathBuf,
}

impl Session {
    pub fn new(engine: ExecutionEngine, host: Box<dyn SceneHost>) -> Self {
        Self {
            log: ConversationLog::new(),
            plans: PlanHistory::default(),
            variants: Vec::new(),
            engine,
            host,
            auto_execute: true,
            thinking: false,
            preview_dir: std::env::temp_dir(),
        }
    }

    pub fn with_auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }

    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = dir.into();
        self
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn plans(&self) -> &PlanHistory {
        &self.plans
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn host(&self) -> &dyn SceneHost {
        self.host.as_ref()
    }

    pub fn auto_execute(&self) -> bool {
        self.auto_execute
    }

    pub fn set_auto_execute(&mut self, on: bool) {
        self.auto_execute = on;
    }

    /// True between accepting an instruction and recording its answer.
    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn scene_summary(&self) -> SceneSummary {
        self.host.active_scene().borrow().summary()
    }

    /// Append the user turn and snapshot the scene for the gateway.
    pub fn begin_turn(&mut self, instruction: &str) -> Result<PendingInstruction> {
        let trimmed = instruction.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::EmptyInstruction);
        }
        let instruction: String = trimmed.chars().take(MAX_INSTRUCTION_CHARS).collect();
        if instruction.len() < trimmed.len() {
            warn!(max = MAX_INSTRUCTION_CHARS, "instruction truncated");
        }

        let turn = ConversationTurn::user(instruction.clone());
        obs::emit_turn_started(turn.id(), instruction.len());
        METRICS.inc_turns();
        let turn_index = self.log.push(turn);
        self.thinking = true;

        Ok(PendingInstruction {
            instruction,
            scene: self.scene_summary(),
            turn_index,
        })
    }

    /// Record the pipeline outcome as an assistant turn. Returns its index.
    ///
    /// With auto-execute on, a new candidate is run immediately; an execution
    /// failure is recorded on the turn rather than returned.
    pub fn complete_turn(&mut self, outcome: Result<Candidate>) -> usize {
        self.thinking = false;
        match outcome {
            Ok(candidate) => {
                let turn = ConversationTurn::assistant(candidate.message, Some(candidate.script.source));
                let index = self.log.push(turn);
                if self.auto_execute {
                    if let Err(err) = self.execute_turn(index) {
                        warn!(turn = index, error = %err, "auto-execute failed");
                    }
                }
                index
            }
            Err(err) => {
                let turn = ConversationTurn::generation_failed(err.to_string());
                obs::emit_turn_failed(turn.id(), &err);
                self.log.push(turn)
            }
        }
    }

    /// Single-context convenience: begin, prepare and complete in one call.
    pub async fn submit(&mut self, pipeline: &InstructionPipeline, instruction: &str) -> Result<usize> {
        let pending = self.begin_turn(instruction)?;
        let outcome = pipeline
            .prepare(&pending.instruction, Some(pending.scene))
            .await;
        Ok(self.complete_turn(outcome))
    }

    /// Run the code on turn `index` against the active scene.
    pub fn execute_turn(&mut self, index: usize) -> Result<ExecutionReport> {
        let scene = self.host.active_scene();
        let turn = self
            .log
            .get_mut(index)
            .ok_or(PipelineError::TurnNotFound(index))?;
        self.engine.run_turn(turn, scene)
    }

    /// Copy the code of turn `index` into a fresh assistant turn and run it.
    ///
    /// The outcome is recorded on the new turn, whose index is returned.
    pub fn rerun(&mut self, index: usize) -> Result<usize> {
        let code = self
            .log
            .get(index)
            .ok_or(PipelineError::TurnNotFound(index))?
            .code()
            .ok_or(TurnError::NoCode)?
            .to_string();
        let fresh = self.log.push(ConversationTurn::assistant(RERUN_MESSAGE, Some(code)));
        if let Err(err) = self.execute_turn(fresh) {
            warn!(turn = fresh, error = %err, "re-run failed");
        }
        Ok(fresh)
    }

    /// Run code submitted directly by a UI, outside the conversation.
    pub fn execute_code(&mut self, code: &str) -> std::result::Result<ExecutionReport, ExecutionError> {
        self.engine.run_source(code, self.host.active_scene())
    }

    pub fn clear(&mut self) {
        self.log.clear();
        self.thinking = false;
        METRICS.flush();
        info!("conversation cleared");
    }

    pub fn save_log(&self, path: &Path) -> Result<()> {
        self.log.save(path)
    }

    pub fn load_log(&mut self, path: &Path) -> Result<()> {
        self.log = ConversationLog::load(path)?;
        Ok(())
    }

    pub fn record_plan(&mut self, prompt: impl Into<String>, plan: impl Into<String>) {
        self.plans.record(prompt, plan);
    }

    /// Emit `plan` and render it in a temporary scene.
    pub fn preview_plan(&mut self, plan: &str) -> std::result::Result<PreviewArtifact, ExecutionError> {
        let script = emitter::emit(plan);
        self.engine
            .preview(&script, self.host.as_mut(), &self.preview_dir)
    }

    /// Preview every script in its own temporary scene.
    ///
    /// A failed preview keeps the variant with no thumbnail.
    pub fn preview_variants(&mut self, scripts: Vec<GeneratedScript>) -> &[Variant] {
        let mut variants = Vec::with_capacity(scripts.len());
        for script in scripts {
            let thumb_path = match self.engine.preview(&script, self.host.as_mut(), &self.preview_dir) {
                Ok(artifact) => Some(artifact.path),
                Err(err) => {
                    warn!(digest = %script.short_digest(), error = %err, "variant preview failed");
                    None
                }
            };
            variants.push(Variant {
                code: script.source,
                thumb_path,
            });
        }
        self.variants = variants;
        &self.variants
    }

    /// Run variant `index` against the active scene.
    pub fn apply_variant(&mut self, index: usize) -> std::result::Result<ExecutionReport, ExecutionError> {
        let code = self
            .variants
            .get(index)
            .map(|v| v.code.clone())
            .ok_or_else(|| ExecutionError::Contract(format!("no variant at index {index}")))?;
        self.engine.run(
            &GeneratedScript::new(code, ScriptOrigin::Generated),
            self.host.active_scene(),
        )
    }

    /// Emit `plan`, run it on the active scene and accept the latest plan.
    pub fn apply_plan(&mut self, plan: &str) -> std::result::Result<ExecutionReport, ExecutionError> {
        let script = emitter::emit(plan);
        let report = self.engine.run(&script, self.host.active_scene())?;
        self.plans.accept_latest();
        Ok(report)
    }
}
