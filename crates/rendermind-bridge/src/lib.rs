//! RenderMind bridge
//!
//! Lets an external UI drive a session over WebSocket. The transport runs
//! on a worker runtime; every request touching the session is marshaled
//! onto the main context through [`MainContext`].
//!
//! - [`protocol`]: JSON message types
//! - [`hub`]: broadcast set owned by one task
//! - [`main_context`]: job channel into the main context
//! - [`server`]: axum router and serve loop

pub mod error;
pub mod hub;
pub mod main_context;
pub mod protocol;
pub mod server;

pub use error::{BridgeError, Result};
pub use hub::{spawn_hub, HubHandle};
pub use main_context::{channel, MainContext, MainLoop};
pub use protocol::{ClientMessage, ServerMessage, WireTurn};
pub use server::{router, serve, serve_listener, BridgeConfig, BridgeState};
