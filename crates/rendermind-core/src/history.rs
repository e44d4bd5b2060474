//! Conversation log and legacy plan history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{ConversationTurn, Result};

/// Append-only ordered list of turns; cleared only wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index.
    pub fn push(&mut self, turn: ConversationTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&ConversationTurn> {
        self.turns.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ConversationTurn> {
        self.turns.get_mut(index)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.turns.iter().position(|t| t.id() == id)
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Write the log as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Read a saved log. Turns left in a state the session can never
    /// resolve are downgraded to `error`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut log: Self = serde_json::from_slice(&bytes)?;
        for turn in &mut log.turns {
            if turn.restore() {
                warn!(id = %turn.id(), error = turn.error(), "restored unfinished turn");
            }
        }
        Ok(log)
    }
}

/// A prompt/plan pair from the legacy plan flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub prompt: String,
    pub plan: String,
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanHistory {
    items: Vec<HistoryItem>,
}

impl PlanHistory {
    pub fn record(&mut self, prompt: impl Into<String>, plan: impl Into<String>) {
        self.items.push(HistoryItem {
            prompt: prompt.into(),
            plan: plan.into(),
            accepted: false,
            timestamp: Utc::now(),
        });
    }

    /// Mark the newest item accepted. Returns false when there is none.
    pub fn accept_latest(&mut self) -> bool {
        match self.items.last_mut() {
            Some(item) => {
                item.accepted = true;
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A previewed script alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub code: String,
    /// Rendered thumbnail; `None` when the preview failed.
    pub thumb_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TurnStatus;

    #[test]
    fn test_push_returns_index() {
        let mut log = ConversationLog::new();
        assert_eq!(log.push(ConversationTurn::user("a")), 0);
        assert_eq!(log.push(ConversationTurn::assistant("b", None)), 1);
        assert_eq!(log.len(), 2);
        let id = log.get(1).unwrap().id();
        assert_eq!(log.position(id), Some(1));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/history.json");
        let mut log = ConversationLog::new();
        log.push(ConversationTurn::user("add a vase"));
        let idx = log.push(ConversationTurn::assistant("ok", Some("code".into())));
        log.get_mut(idx).unwrap().begin_execution().unwrap();
        log.get_mut(idx).unwrap().finish_success().unwrap();
        log.save(&path).unwrap();

        let loaded = ConversationLog::load(&path).unwrap();
        assert_eq!(loaded, log);
        assert_eq!(loaded.last().unwrap().status(), TurnStatus::Success);
    }

    #[test]
    fn test_load_downgrades_unfinished_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut log = ConversationLog::new();
        let pending = log.push(ConversationTurn::assistant("ok", Some("code".into())));
        log.get_mut(pending).unwrap().begin_execution().unwrap();
        log.push(ConversationTurn::assistant("chat only", None));
        log.save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["turns"][1]["status"] = serde_json::json!("success");
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let loaded = ConversationLog::load(&path).unwrap();
        let first = loaded.get(0).unwrap();
        assert_eq!(first.status(), TurnStatus::Error);
        assert_eq!(first.error(), Some("interrupted"));
        assert!(first.status().is_terminal());
        let second = loaded.get(1).unwrap();
        assert_eq!(second.status(), TurnStatus::Error);
        assert!(second.code().is_none());
    }

    #[test]
    fn test_plan_history_accept_latest() {
        let mut plans = PlanHistory::default();
        assert!(!plans.accept_latest());
        plans.record("vase", "cylinder");
        plans.record("ball", "uv_sphere r=1");
        assert!(plans.accept_latest());
        assert!(!plans.items()[0].accepted);
        assert!(plans.items()[1].accepted);
    }
}
