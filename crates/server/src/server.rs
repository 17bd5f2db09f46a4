//! Pointer protocol server.
//!
//! Accepts one agent connection at a time and serves it until it closes,
//! goes idle, or is preempted by a newer connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mouserelay_state::StateQueue;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ServerError;
use crate::reader::OpcodeReader;
use crate::session::{Session, SessionEnd};
use crate::wire::Opcode;
use crate::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: IpAddr,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Drop a session when no complete opcode arrives for this long.
    pub idle_timeout: Option<Duration>,
    /// Discard pending samples whenever a new session starts.
    pub clear_on_connect: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            clear_on_connect: false,
        }
    }
}

/// What woke the session loop while it waited for the next opcode.
enum Wake {
    Opcode(Opcode),
    End(SessionEnd),
    Preempted(TcpStream, SocketAddr),
}

/// The pointer protocol server.
///
/// Serves a shared [`StateQueue`] to a single agent at a time.
pub struct MouseServer {
    config: ServerConfig,
    queue: Arc<StateQueue>,
    cancel: CancellationToken,
    running: AtomicBool,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl MouseServer {
    /// Creates a new server over the given queue.
    pub fn new(config: ServerConfig, queue: Arc<StateQueue>) -> Arc<Self> {
        Arc::new(Self {
            config,
            queue,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            local_addr: Mutex::new(None),
        })
    }

    /// The queue producers should feed.
    pub fn queue(&self) -> &Arc<StateQueue> {
        &self.queue
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`listen`](Self::listen) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns `true` while [`serve`](Self::serve) is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the server after the current protocol step.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the configured address.
    pub async fn listen(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind((self.config.bind_addr, self.config.port)).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        info!("mouse server listening on {local_addr}");
        Ok(listener)
    }

    /// Binds and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = self.listen().await?;
        self.serve(listener).await
    }

    /// Serves connections from `listener` until shutdown.
    ///
    /// A listener fault is logged and stops the server; it is not retried.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let result = self.accept_loop(&listener).await;
        if let Err(e) = &result {
            error!("listener failed, stopping: {e}");
        }
        drop(listener);

        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<(), ServerError> {
        let mut next: Option<(TcpStream, SocketAddr)> = None;

        loop {
            let (stream, peer_addr) = match next.take() {
                Some(conn) => conn,
                None => tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    result = listener.accept() => result?,
                },
            };

            next = self.serve_connection(listener, stream, peer_addr).await?;

            if self.cancel.is_cancelled() {
                break;
            }
        }

        info!("mouse server shutting down");
        Ok(())
    }

    /// Runs the protocol on one socket.
    ///
    /// Returns the connection that preempted this one, if any.
    async fn serve_connection(
        &self,
        listener: &TcpListener,
        mut stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<Option<(TcpStream, SocketAddr)>, ServerError> {
        info!(%peer_addr, "agent connected");
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%peer_addr, "failed to set TCP_NODELAY: {e}");
        }
        if self.config.clear_on_connect {
            self.queue.clear();
        }

        let mut session = Session::new(Arc::clone(&self.queue));
        let mut reader = OpcodeReader::new();
        let mut deadline = self.idle_deadline();

        let (end, preempting) = loop {
            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Wake::End(SessionEnd::Cancelled),
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    Wake::Preempted(stream, addr)
                }
                read = read_opcode(&mut reader, &mut stream, deadline) => read,
            };

            let opcode = match wake {
                Wake::Opcode(opcode) => opcode,
                Wake::End(end) => break (end, None),
                Wake::Preempted(stream, addr) => {
                    info!(%peer_addr, new_peer = %addr, "newer connection waiting, dropping current");
                    break (SessionEnd::Preempted, Some((stream, addr)));
                }
            };
            deadline = self.idle_deadline();

            match session.handle(opcode, &mut stream).await {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(end)) => break (end, None),
                Err(e) => {
                    warn!(%peer_addr, "write failed: {e}");
                    break (SessionEnd::Disconnected, None);
                }
            }
        };

        match end {
            SessionEnd::IdleTimeout => info!(
                %peer_addr,
                partial_bytes = reader.partial_len(),
                "session idle, closing"
            ),
            _ => debug!(
                %peer_addr,
                ?end,
                initialized = session.is_initialized(),
                reads = session.reads_served(),
                "session ended"
            ),
        }
        Ok(preempting)
    }

    fn idle_deadline(&self) -> Option<Instant> {
        self.config.idle_timeout.map(|t| Instant::now() + t)
    }
}

/// Waits for the next complete opcode, bounded by `deadline`.
async fn read_opcode(
    reader: &mut OpcodeReader,
    stream: &mut TcpStream,
    deadline: Option<Instant>,
) -> Wake {
    let read = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, reader.next(stream)).await {
            Ok(read) => read,
            Err(_) => return Wake::End(SessionEnd::IdleTimeout),
        },
        None => reader.next(stream).await,
    };

    match read {
        Ok(Some(opcode)) => Wake::Opcode(opcode),
        Ok(None) => Wake::End(SessionEnd::Disconnected),
        Err(e) => {
            debug!("read failed: {e}");
            Wake::End(SessionEnd::Disconnected)
        }
    }
}
