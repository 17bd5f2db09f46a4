//! TCP protocol handler exposing pointer state to a remote agent.
//!
//! One client at a time polls the server with 4-byte ASCII opcodes and
//! receives fixed-size binary replies built from a shared
//! [`StateQueue`](mouserelay_state::StateQueue).
//!
//! # Wire format
//!
//! See [`wire`] module for the binary protocol specification.

pub mod error;
pub mod reader;
pub mod server;
pub mod session;
pub mod wire;

pub use error::ServerError;
pub use server::{MouseServer, ServerConfig};
pub use session::{Session, SessionEnd};
pub use wire::Opcode;

use std::time::Duration;

/// Default TCP port the exposer listens on.
pub const DEFAULT_PORT: u16 = 9777;

/// How long a session may go without a complete opcode before it is dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
