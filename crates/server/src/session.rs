//! Per-connection protocol state machine.

use std::ops::ControlFlow;
use std::sync::Arc;

use mouserelay_state::StateQueue;
use tokio::io::AsyncWrite;
use tracing::{debug, info, trace, warn};

use crate::wire::{self, Opcode};

/// Why a session stopped serving its socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `MICE` liveness check answered.
    SocketCheck,
    /// Agent sent `CLOS`.
    Closed,
    /// `READ` or `CLOS` arrived before `INIT`.
    ProtocolViolation(Opcode),
    /// Peer closed the socket or an I/O error occurred.
    Disconnected,
    /// No complete opcode arrived within the idle timeout.
    IdleTimeout,
    /// A newer connection was accepted while this one was waiting.
    Preempted,
    /// The server is shutting down.
    Cancelled,
}

/// Protocol state for one connected agent.
pub struct Session {
    queue: Arc<StateQueue>,
    initialized: bool,
    reads_served: u64,
}

impl Session {
    pub fn new(queue: Arc<StateQueue>) -> Self {
        Self {
            queue,
            initialized: false,
            reads_served: 0,
        }
    }

    /// Whether `INIT` has been received on this connection.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of `READ` replies written so far.
    pub fn reads_served(&self) -> u64 {
        self.reads_served
    }

    /// Applies one opcode, writing its reply (if any) to `writer`.
    ///
    /// Returns `Break` when the connection should be closed.
    pub async fn handle<W: AsyncWrite + Unpin>(
        &mut self,
        opcode: Opcode,
        writer: &mut W,
    ) -> std::io::Result<ControlFlow<SessionEnd>> {
        match opcode {
            Opcode::Mice => {
                wire::write_mice_reply(writer).await?;
                info!("socket check");
                Ok(ControlFlow::Break(SessionEnd::SocketCheck))
            }
            Opcode::Init => {
                self.initialized = true;
                debug!("session initialized");
                Ok(ControlFlow::Continue(()))
            }
            Opcode::Read | Opcode::Close if !self.initialized => {
                warn!(?opcode, "request before INIT, abandoning connection");
                Ok(ControlFlow::Break(SessionEnd::ProtocolViolation(opcode)))
            }
            Opcode::Read => {
                let state = self.queue.drain_coalesced();
                wire::write_state(writer, state.as_ref()).await?;
                self.reads_served += 1;
                debug!(?state, "pointer state sent to agent");
                Ok(ControlFlow::Continue(()))
            }
            Opcode::Close => {
                info!(reads = self.reads_served, "close");
                Ok(ControlFlow::Break(SessionEnd::Closed))
            }
            Opcode::Unknown(raw) => {
                trace!(?raw, "ignoring unknown opcode");
                Ok(ControlFlow::Continue(()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mouserelay_state::PointerState;

    use super::*;
    use crate::wire::STATE_RESPONSE_LEN;

    fn session() -> (Session, Arc<StateQueue>) {
        let queue = Arc::new(StateQueue::new());
        (Session::new(Arc::clone(&queue)), queue)
    }

    #[tokio::test]
    async fn mice_replies_and_ends_session() {
        let (mut session, _) = session();
        let mut out = Vec::new();

        let flow = session.handle(Opcode::Mice, &mut out).await.unwrap();

        assert_eq!(flow, ControlFlow::Break(SessionEnd::SocketCheck));
        assert_eq!(out, b"ECIM");
    }

    #[tokio::test]
    async fn read_before_init_writes_nothing() {
        let (mut session, queue) = session();
        queue.enqueue(PointerState::at(1, 1));
        let mut out = Vec::new();

        let flow = session.handle(Opcode::Read, &mut out).await.unwrap();

        assert_eq!(
            flow,
            ControlFlow::Break(SessionEnd::ProtocolViolation(Opcode::Read))
        );
        assert!(out.is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn close_before_init_is_violation() {
        let (mut session, _) = session();
        let mut out = Vec::new();

        let flow = session.handle(Opcode::Close, &mut out).await.unwrap();

        assert_eq!(
            flow,
            ControlFlow::Break(SessionEnd::ProtocolViolation(Opcode::Close))
        );
    }

    #[tokio::test]
    async fn init_then_read_serves_state_and_repeats() {
        let (mut session, queue) = session();
        queue.enqueue(PointerState::at(10, 20).with_buttons(true, false));
        let mut out = Vec::new();

        session.handle(Opcode::Init, &mut out).await.unwrap();
        assert!(session.is_initialized());
        assert!(out.is_empty());

        session.handle(Opcode::Read, &mut out).await.unwrap();
        session.handle(Opcode::Read, &mut out).await.unwrap();

        let expected = [0x01, 0x0A, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(out.len(), 2 * STATE_RESPONSE_LEN);
        assert_eq!(&out[..STATE_RESPONSE_LEN], &expected);
        assert_eq!(&out[STATE_RESPONSE_LEN..], &expected);
        assert_eq!(session.reads_served(), 2);
    }

    #[tokio::test]
    async fn idle_reads_do_not_repeat_scroll() {
        let (mut session, queue) = session();
        queue.enqueue(PointerState::at(1, 1).with_wheel(-5));
        let mut out = Vec::new();

        session.handle(Opcode::Init, &mut out).await.unwrap();
        for _ in 0..3 {
            session.handle(Opcode::Read, &mut out).await.unwrap();
        }

        let wheel: Vec<u8> = out
            .chunks(STATE_RESPONSE_LEN)
            .map(|reply| reply[9])
            .collect();
        assert_eq!(wheel, [0xFF, 0x00, 0x00]);
        for reply in out.chunks(STATE_RESPONSE_LEN) {
            assert_eq!(&reply[1..5], &1i32.to_le_bytes());
        }
    }

    #[tokio::test]
    async fn read_with_nothing_captured_is_zeroed() {
        let (mut session, _) = session();
        let mut out = Vec::new();

        session.handle(Opcode::Init, &mut out).await.unwrap();
        session.handle(Opcode::Read, &mut out).await.unwrap();

        assert_eq!(out, [0u8; STATE_RESPONSE_LEN]);
    }

    #[tokio::test]
    async fn unknown_opcode_is_ignored() {
        let (mut session, _) = session();
        let mut out = Vec::new();

        let flow = session
            .handle(Opcode::parse(*b"PING"), &mut out)
            .await
            .unwrap();

        assert_eq!(flow, ControlFlow::Continue(()));
        assert!(out.is_empty());
        assert!(!session.is_initialized());
    }

    #[tokio::test]
    async fn close_after_init_ends_session() {
        let (mut session, _) = session();
        let mut out = Vec::new();

        session.handle(Opcode::Init, &mut out).await.unwrap();
        let flow = session.handle(Opcode::Close, &mut out).await.unwrap();

        assert_eq!(flow, ControlFlow::Break(SessionEnd::Closed));
        assert!(out.is_empty());
    }
}
