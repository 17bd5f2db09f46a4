//! Application orchestrator: wires the queue, producer and server together.

use std::sync::Arc;

use mouserelay_server::MouseServer;
use mouserelay_state::StateQueue;

use crate::config::Config;
use crate::producer;

/// Runs the exposer until Ctrl+C or a fatal server error.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let queue = Arc::new(StateQueue::new());
    let server = MouseServer::new(config.server_config(), Arc::clone(&queue));

    let server_run = Arc::clone(&server);
    let mut server_task = tokio::spawn(async move { server_run.run().await });

    if config.stdin_producer {
        // Detached: blocks on stdin until EOF.
        producer::spawn_stdin(Arc::clone(&queue))?;
    }

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    server.shutdown();
    server_task.await??;
    Ok(())
}
