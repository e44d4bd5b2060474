//! Asset library error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("unsupported asset format '{format}' for {path}")]
    UnsupportedFormat { format: String, path: PathBuf },

    #[error("asset root not found: {0}")]
    RootMissing(PathBuf),

    #[error("asset walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
