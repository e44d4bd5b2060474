//! Execution engine error types.

use crate::safety::Violation;
use crate::scene::SceneError;

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("script rejected by safety filter ({} violation(s))", .0.len())]
    Unsafe(Vec<Violation>),

    #[error("script contract violated: {0}")]
    Contract(String),

    #[error("script failed: {0}")]
    Runtime(String),

    #[error("script panicked: {0}")]
    Panicked(String),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("render failed: {0}")]
    Render(String),
}

impl ExecutionError {
    /// Whether the script body started running before the failure.
    pub fn reached_scene(&self) -> bool {
        matches!(
            self,
            ExecutionError::Runtime(_) | ExecutionError::Panicked(_) | ExecutionError::Render(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ExecutionError::Unsafe(Vec::new()).to_string(),
            "script rejected by safety filter (0 violation(s))"
        );
        let err = ExecutionError::Runtime("Variable not found: x".into());
        assert!(err.to_string().contains("Variable not found"));
        assert!(err.reached_scene());
        assert!(!ExecutionError::Contract("missing".into()).reached_scene());
    }
}
