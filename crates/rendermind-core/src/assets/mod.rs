//! Asset matcher: local model library search and deterministic import scripts.
//!
//! A confident match (top score at or above the shortcut threshold) stands in
//! for a generation call entirely.

pub mod error;
pub mod format;
pub mod import_script;
pub mod matcher;

pub use error::AssetError;
pub use format::AssetFormat;
pub use import_script::build_import_script;
pub use matcher::{meaningful_words, AssetLibrary, AssetRecord, MatchConfig, ScoreLadder};
