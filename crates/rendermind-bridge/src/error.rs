//! Bridge error types.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("main context is no longer running")]
    MainContextGone,

    #[error("main context dropped the reply")]
    ReplyDropped,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
