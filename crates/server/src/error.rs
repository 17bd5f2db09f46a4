//! Error types for the pointer protocol server.

/// Errors produced by the pointer protocol server.
///
/// Only listener faults surface here; problems on an individual session end
/// that session and are never returned.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server already running")]
    AlreadyRunning,
}
