//! WebSocket connection management, heartbeat, sessions, and the idle
//! sweeper.

pub mod connection;
pub mod registry;
pub mod session;
pub mod sweep;
