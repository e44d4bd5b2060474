//! Conversation turns and the per-turn execution state machine.
//!
//! A turn moves `none → pending → {success, error}`. There is no way back to
//! `pending`: retrying a script means appending a fresh turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TurnError;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// Execution status of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Pure conversational exchange, or code not yet run.
    #[default]
    None,
    Pending,
    Success,
    Error,
}

impl TurnStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnStatus::Success | TurnStatus::Error)
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnStatus::None => write!(f, "none"),
            TurnStatus::Pending => write!(f, "pending"),
            TurnStatus::Success => write!(f, "success"),
            TurnStatus::Error => write!(f, "error"),
        }
    }
}

/// One entry in the conversation log.
///
/// Fields are private so the status can only move through the transition
/// methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    id: Uuid,
    role: Role,
    content: String,
    code: Option<String>,
    timestamp: DateTime<Utc>,
    status: TurnStatus,
    error: Option<String>,
}

impl ConversationTurn {
    fn new(role: Role, content: impl Into<String>, code: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            code,
            timestamp: Utc::now(),
            status: TurnStatus::None,
            error: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None)
    }

    pub fn assistant(content: impl Into<String>, code: Option<String>) -> Self {
        Self::new(Role::Assistant, content, code)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, None)
    }

    /// Assistant turn recording a generation failure.
    ///
    /// Nothing was attempted, so the turn carries no code.
    pub fn generation_failed(error: impl Into<String>) -> Self {
        let error = error.into();
        let mut turn = Self::new(
            Role::Assistant,
            format!("Sorry, I encountered an error: {error}"),
            None,
        );
        turn.status = TurnStatus::Error;
        turn.error = Some(error);
        turn
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Wall-clock `HH:MM` used by chat renderers.
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }

    pub fn status(&self) -> TurnStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `none → pending`. Returns the code about to be attempted.
    pub fn begin_execution(&mut self) -> Result<&str, TurnError> {
        if self.status != TurnStatus::None {
            return Err(TurnError::InvalidTransition {
                from: self.status,
                to: TurnStatus::Pending,
            });
        }
        let Some(code) = self.code.as_deref() else {
            return Err(TurnError::NoCode);
        };
        self.status = TurnStatus::Pending;
        Ok(code)
    }

    /// `pending → success`.
    pub fn finish_success(&mut self) -> Result<(), TurnError> {
        self.finish(TurnStatus::Success, None)
    }

    /// `pending → error`, keeping the failure detail.
    pub fn finish_error(&mut self, message: impl Into<String>) -> Result<(), TurnError> {
        self.finish(TurnStatus::Error, Some(message.into()))
    }

    /// Repair a turn read back from disk so it satisfies the state machine.
    ///
    /// A `pending` turn was cut off mid-run and can never finish, so it
    /// becomes `error: interrupted`. A `success` turn without code cannot
    /// have run anything and is downgraded the same way. Returns whether the
    /// turn changed.
    pub fn restore(&mut self) -> bool {
        let reason = match (self.status, self.code.is_some()) {
            (TurnStatus::Pending, _) => "interrupted",
            (TurnStatus::Success, false) => "success recorded without code",
            _ => return false,
        };
        self.status = TurnStatus::Error;
        self.error = Some(reason.to_string());
        true
    }

    fn finish(&mut self, to: TurnStatus, error: Option<String>) -> Result<(), TurnError> {
        if self.status != TurnStatus::Pending {
            return Err(TurnError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.error = error;
        Ok(())
    }
}
