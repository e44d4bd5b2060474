//! Execution engine: validate, then run a script against a scene.
//!
//! - [`compiled`]: parse + entry-point contract check
//! - [`context`]: the `Context` type scripts receive
//! - [`modules`]: static import table
//! - [`preview`]: throwaway-scene execution with guaranteed teardown
//! - [`error`]: `ExecutionError`
//!
//! Every failure is returned as a value. Script errors, limit overruns and
//! panics inside host callbacks stop at this boundary.

pub mod compiled;
pub mod context;
pub mod error;
pub mod modules;
pub mod preview;

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Instant;

use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ConversationTurn, GeneratedScript, PipelineError, ScriptOrigin, ENTRY_POINT};
use crate::metrics::METRICS;
use crate::obs;
use crate::safety::SafetyFilter;
use crate::scene::SharedScene;

pub use compiled::CompiledScript;
pub use context::{RunLog, ScriptContext};
pub use error::ExecutionError;
pub use preview::PreviewArtifact;

/// Resource ceilings applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    pub max_modules: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_operations: 500_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 64 * 1024,
            max_array_size: 10_000,
            max_map_size: 1_000,
            max_modules: 8,
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Short digest of the script that ran.
    pub digest: String,
    pub duration_ms: u64,
    /// Lines from `context.log` and `print`.
    pub log: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    filter: SafetyFilter,
    limits: ExecutionLimits,
}

impl ExecutionEngine {
    pub fn new(filter: SafetyFilter, limits: ExecutionLimits) -> Self {
        Self { filter, limits }
    }

    pub fn standard() -> Self {
        Self::new(SafetyFilter::standard(), ExecutionLimits::default())
    }

    pub fn filter(&self) -> &SafetyFilter {
        &self.filter
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// A fresh, hardened script engine whose output lands in `log`.
    fn build_engine(&self, log: &RunLog) -> Engine {
        let mut engine = Engine::new();
        engine.disable_symbol("eval");
        engine.set_max_operations(self.limits.max_operations);
        engine.set_max_call_levels(self.limits.max_call_levels);
        engine.set_max_expr_depths(self.limits.max_expr_depth, self.limits.max_expr_depth);
        engine.set_max_string_size(self.limits.max_string_size);
        engine.set_max_array_size(self.limits.max_array_size);
        engine.set_max_map_size(self.limits.max_map_size);
        engine.set_max_modules(self.limits.max_modules);
        engine.set_module_resolver(modules::resolver_for(self.filter.allowlist()));

        let sink = Rc::clone(log);
        engine.on_print(move |text| sink.borrow_mut().push(text.to_string()));
        let sink = Rc::clone(log);
        engine.on_debug(move |text, _, _| sink.borrow_mut().push(format!("[debug] {text}")));

        context::register_context(&mut engine);
        engine
    }

    /// Reject unsafe scripts without touching any scene.
    fn screen(&self, script: &GeneratedScript) -> Result<(), ExecutionError> {
        let verdict = self.filter.validate(&script.source);
        if verdict.is_safe {
            return Ok(());
        }
        METRICS.inc_rejections();
        obs::emit_script_rejected(&script.short_digest(), verdict.violations.len());
        Err(ExecutionError::Unsafe(verdict.violations))
    }

    /// Validate `script`, then invoke its entry point against `target`.
    pub fn run(
        &self,
        script: &GeneratedScript,
        target: SharedScene,
    ) -> Result<ExecutionReport, ExecutionError> {
        self.screen(script)?;
        self.run_screened(script, target)
    }

    /// Run user-supplied source verbatim (still screened).
    pub fn run_source(
        &self,
        source: &str,
        target: SharedScene,
    ) -> Result<ExecutionReport, ExecutionError> {
        self.run(&GeneratedScript::new(source, ScriptOrigin::User), target)
    }

    fn run_screened(
        &self,
        script: &GeneratedScript,
        target: SharedScene,
    ) -> Result<ExecutionReport, ExecutionError> {
        let digest = script.short_digest();
        let log: RunLog = Rc::default();
        let started = Instant::now();
        let outcome = self.invoke(&script.source, target, &log);
        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_execution_finished(&digest, outcome.is_ok(), duration_ms);

        let warnings = outcome.inspect_err(|_| METRICS.inc_execution_failures())?;
        let log = log.borrow().clone();
        Ok(ExecutionReport {
            digest,
            duration_ms,
            log,
            warnings,
        })
    }

    fn invoke(
        &self,
        source: &str,
        target: SharedScene,
        log: &RunLog,
    ) -> Result<Vec<String>, ExecutionError> {
        let engine = self.build_engine(log);
        let compiled = CompiledScript::compile(&engine, source)?;
        let context = ScriptContext::new(target, Rc::clone(log));
        let mut scope = Scope::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.call_fn::<Dynamic>(&mut scope, compiled.ast(), ENTRY_POINT, (context,))
        }));
        let value = match result {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(ExecutionError::Runtime(err.to_string())),
            Err(payload) => return Err(ExecutionError::Panicked(panic_message(payload.as_ref()))),
        };

        let mut warnings = Vec::new();
        if !value.is_unit() {
            let msg = format!(
                "`{ENTRY_POINT}` returned a {} value; it was ignored",
                value.type_name()
            );
            warn!(returned = value.type_name(), "entry point returned a value");
            warnings.push(msg);
        }
        Ok(warnings)
    }

    /// Execute the code on `turn`, moving it `none → pending → {success, error}`.
    ///
    /// Execution failures are recorded on the turn and also returned.
    pub fn run_turn(
        &self,
        turn: &mut ConversationTurn,
        target: SharedScene,
    ) -> Result<ExecutionReport, PipelineError> {
        let code = turn.begin_execution()?.to_string();
        let _span = obs::TurnSpan::enter(turn.id());
        match self.run(&GeneratedScript::new(code, ScriptOrigin::Generated), target) {
            Ok(report) => {
                turn.finish_success()?;
                Ok(report)
            }
            Err(err) => {
                let err = PipelineError::from(err);
                turn.finish_error(err.to_string())?;
                Err(err)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TurnStatus;
    use crate::scene::{share, MemoryScene, SceneHandle};
    use std::cell::RefCell;

    fn scene() -> (Rc<RefCell<MemoryScene>>, SharedScene) {
        let concrete = Rc::new(RefCell::new(MemoryScene::with_default_cube("Scene")));
        let shared: SharedScene = concrete.clone();
        (concrete, shared)
    }

    #[test]
    fn test_run_mutates_scene() {
        let (concrete, shared) = scene();
        let src = r#"
fn rendermind_action(context) {
    let name = context.add_uv_sphere(#{ radius: 0.5, location: [0, 0, 0.5] });
    context.rename(name, "Ball");
    context.log("made " + name);
}
"#;
        let report = ExecutionEngine::standard().run_source(src, shared).unwrap();
        assert!(concrete.borrow().object("Ball").is_some());
        assert_eq!(report.log, ["made Sphere"]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unsafe_script_never_runs() {
        let (concrete, shared) = scene();
        let src = "fn rendermind_action(context) { context.add_cube(); os.system(\"ls\"); }";
        let err = ExecutionEngine::standard().run_source(src, shared).unwrap_err();
        assert!(matches!(err, ExecutionError::Unsafe(ref v) if !v.is_empty()));
        assert_eq!(concrete.borrow().object_names(), ["Cube"]);
    }

    #[test]
    fn test_runtime_error_is_contained() {
        let (_, shared) = scene();
        let src = "fn rendermind_action(context) { context.rename(\"Nope\", \"X\"); }";
        let err = ExecutionEngine::standard().run_source(src, shared).unwrap_err();
        match err {
            ExecutionError::Runtime(msg) => assert!(msg.contains("object not found: Nope")),
            other => panic!("expected Runtime, got {other:?}"),
        }
    }

    #[test]
    fn test_runaway_loop_hits_operation_limit() {
        let (_, shared) = scene();
        let limits = ExecutionLimits {
            max_operations: 1_000,
            ..ExecutionLimits::default()
        };
        let engine = ExecutionEngine::new(SafetyFilter::standard(), limits);
        let src = "fn rendermind_action(context) { loop { } }";
        assert!(matches!(
            engine.run_source(src, shared),
            Err(ExecutionError::Runtime(_))
        ));
    }

    #[test]
    fn test_return_value_is_discarded_with_warning() {
        let (_, shared) = scene();
        let src = "fn rendermind_action(context) { 42 }";
        let report = ExecutionEngine::standard().run_source(src, shared).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("ignored"));
    }

    #[test]
    fn test_allowlisted_import_resolves() {
        let (concrete, shared) = scene();
        let src = r#"
fn rendermind_action(context) {
    import "math" as m;
    let r = m::clamp(3.0, 0.1, 1.5);
    context.add_uv_sphere(#{ radius: r });
}
"#;
        ExecutionEngine::standard().run_source(src, shared).unwrap();
        assert_eq!(concrete.borrow().object_names(), ["Cube", "Sphere"]);
    }

    #[test]
    fn test_run_turn_records_status() {
        let (_, shared) = scene();
        let engine = ExecutionEngine::standard();

        let mut ok = ConversationTurn::assistant("ok", Some("fn rendermind_action(context) {}".into()));
        engine.run_turn(&mut ok, shared.clone()).unwrap();
        assert_eq!(ok.status(), TurnStatus::Success);

        let mut bad = ConversationTurn::assistant(
            "bad",
            Some("fn rendermind_action(context) { let x = 1 / 0; }".into()),
        );
        assert!(engine.run_turn(&mut bad, shared.clone()).is_err());
        assert_eq!(bad.status(), TurnStatus::Error);
        assert!(bad.error().is_some());

        // A finished turn cannot be re-run; retries are fresh turns.
        assert!(matches!(
            engine.run_turn(&mut bad, shared),
            Err(PipelineError::Turn(_))
        ));
    }

    #[test]
    fn test_share_helper_coerces() {
        let shared = share(MemoryScene::new("Empty"));
        assert!(shared.borrow().object_names().is_empty());
    }
}
