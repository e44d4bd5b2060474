//! Pipeline-level error taxonomy for RenderMind.

use crate::assets::AssetError;
use crate::engine::ExecutionError;
use crate::gateway::BackendError;
use crate::safety::Violation;

use super::turn::TurnStatus;

/// Errors produced by illegal turn state transitions.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("invalid turn transition: {from} -> {to}")]
    InvalidTransition { from: TurnStatus, to: TurnStatus },

    #[error("turn carries no code to execute")]
    NoCode,
}

/// Errors surfaced by the instruction-to-execution pipeline.
///
/// None of these are fatal to the host: every variant leaves the session
/// usable for the next instruction.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("instruction must not be empty")]
    EmptyInstruction,

    #[error("unsafe script: {}", summarize(.violations))]
    UnsafeScript { violations: Vec<Violation> },

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("execution error: {0}")]
    Execution(ExecutionError),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("turn error: {0}")]
    Turn(#[from] TurnError),

    #[error("turn not found: {0}")]
    TurnNotFound(usize),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExecutionError> for PipelineError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Unsafe(violations) => PipelineError::UnsafeScript { violations },
            other => PipelineError::Execution(other),
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
