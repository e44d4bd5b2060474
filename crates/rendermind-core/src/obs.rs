//! Structured observability hooks for the instruction pipeline.
//!
//! - Turn-scoped spans via the `TurnSpan` RAII guard
//! - One `emit_*` function per lifecycle event
//!
//! Events are emitted at `info!` level, rejections and failures at `warn!`.

use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;

/// RAII guard that enters a turn-scoped span.
///
/// ```ignore
/// let _span = TurnSpan::enter(turn.id());
/// // every event below carries turn_id
/// ```
pub struct TurnSpan {
    _span: tracing::span::EnteredSpan,
}

impl TurnSpan {
    pub fn enter(turn_id: Uuid) -> Self {
        let span = tracing::info_span!("rendermind.turn", turn_id = %turn_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a user instruction opened a turn.
pub fn emit_turn_started(turn_id: Uuid, instruction_len: usize) {
    info!(event = "turn.started", turn_id = %turn_id, instruction_len = instruction_len);
}

/// Emit event: a library asset replaced the generation call.
pub fn emit_asset_shortcut(query: &str, path: &Path, score: u32) {
    info!(
        event = "asset.shortcut",
        query = %query,
        path = %path.display(),
        score = score,
    );
}

/// Emit event: a generation backend call completed.
pub fn emit_generation_finished(provider: &str, duration_ms: u64, fenced: bool, success: bool) {
    info!(
        event = "generation.finished",
        provider = %provider,
        duration_ms = duration_ms,
        fenced = fenced,
        success = success,
    );
}

/// Emit event: the safety filter refused a script.
pub fn emit_script_rejected(digest: &str, violations: usize) {
    warn!(event = "script.rejected", digest = %digest, violations = violations);
}

/// Emit event: a script ran to completion or failure.
pub fn emit_execution_finished(digest: &str, success: bool, duration_ms: u64) {
    info!(
        event = "execution.finished",
        digest = %digest,
        success = success,
        duration_ms = duration_ms,
    );
}

/// Emit event: a temporary preview scene was torn down.
pub fn emit_preview_teardown(scene: &str, removed: bool) {
    info!(event = "preview.teardown", scene = %scene, removed = removed);
}

/// Emit event: a turn could not be completed (warning level).
pub fn emit_turn_failed(turn_id: Uuid, error: &dyn std::fmt::Display) {
    warn!(event = "turn.failed", turn_id = %turn_id, error = %error);
}
