//! WebSocket push gateway.
//!
//! Connections authenticate with `?token=<jwt>` at upgrade time and are
//! indexed by user so notifications can be pushed to every open tab.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
