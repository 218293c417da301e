//! Real-time voice sessions over WebSockets.
//!
//! - `protocol`: the binary/JSON frame format spoken with the client.
//! - `connection`: the client connection abstraction and its axum implementation.
//! - `relay`: the duplex relay that owns one session's two forwarding directions.
//! - `session`: the `/voice` gateway that opens the backend session and runs the relay.

pub mod connection;
pub mod protocol;
pub mod relay;
pub mod session;

pub use session::ws_handler;
