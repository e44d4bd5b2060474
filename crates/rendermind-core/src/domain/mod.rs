//! Domain model for the instruction-to-execution pipeline.
//!
//! - [`script`]: `GeneratedScript` and the fixed `rendermind_action(context)` entry point
//! - [`turn`]: `ConversationTurn`, its role and execution status state machine
//! - [`error`]: `PipelineError` / `TurnError`

pub mod error;
pub mod script;
pub mod turn;

pub use error::{PipelineError, Result, TurnError};
pub use script::{quote_literal, GeneratedScript, ScriptOrigin, ENTRY_POINT};
pub use turn::{ConversationTurn, Role, TurnStatus};
