//! Line-oriented pointer sample producer.
//!
//! Reads one JSON [`PointerState`] per line, e.g.
//! `{"x":10,"y":20,"leftButtonDown":true,"rightButtonDown":false,"wheel":0}`,
//! and pushes it into the shared queue.

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use mouserelay_state::{PointerState, StateQueue};

/// Enqueues every valid sample from `input`. Returns the number enqueued.
///
/// Blank lines are skipped; malformed lines are logged and skipped.
pub fn feed_lines<R: BufRead>(input: R, queue: &StateQueue) -> usize {
    let mut fed = 0;
    for (index, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("producer input failed: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<PointerState>(line) {
            Ok(state) => {
                queue.enqueue(state);
                fed += 1;
            }
            Err(e) => tracing::warn!(line = index + 1, "skipping malformed sample: {e}"),
        }
    }
    fed
}

/// Feeds the queue from stdin on a dedicated thread until EOF.
pub fn spawn_stdin(queue: Arc<StateQueue>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-producer".into())
        .spawn(move || {
            let fed = feed_lines(std::io::stdin().lock(), &queue);
            tracing::info!(samples = fed, "stdin producer finished");
        })
}
