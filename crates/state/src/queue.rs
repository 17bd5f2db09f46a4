use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::COALESCE_DISTANCE;
use crate::state::PointerState;

/// FIFO of pointer samples plus the last sample reported to a client.
///
/// Producers call [`enqueue`](Self::enqueue) from their own threads; the
/// protocol handler calls [`drain_coalesced`](Self::drain_coalesced) once per
/// read request. Every operation takes the same lock, so a drain sees a
/// consistent snapshot while it pops several samples.
#[derive(Debug, Default)]
pub struct StateQueue {
    inner: Mutex<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: VecDeque<PointerState>,
    last_delivered: Option<PointerState>,
}

impl StateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample to the tail of the queue.
    pub fn enqueue(&self, state: PointerState) {
        self.lock().pending.push_back(state);
    }

    /// Drops all pending samples. The last delivered sample is kept.
    pub fn clear(&self) {
        self.lock().pending.clear();
    }

    /// Number of samples waiting to be drained.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// The most recent sample popped by [`drain_coalesced`](Self::drain_coalesced).
    #[cfg(test)]
    fn last_delivered(&self) -> Option<PointerState> {
        self.lock().last_delivered
    }

    /// Returns the sample to report for one read request.
    ///
    /// With nothing pending, the last delivered position and buttons are
    /// repeated with the wheel zeroed, so an idle poll never scrolls again
    /// (`None` if nothing was ever delivered). The stored sample is left
    /// untouched.
    ///
    /// Otherwise the head is popped and, unless this is the first delivery,
    /// later samples replace it while they keep the same buttons and scroll
    /// direction and stay within [`COALESCE_DISTANCE`] of the last delivered
    /// position.
    pub fn drain_coalesced(&self) -> Option<PointerState> {
        let mut inner = self.lock();
        let QueueInner {
            pending,
            last_delivered,
        } = &mut *inner;

        let Some(mut candidate) = pending.pop_front() else {
            return last_delivered.map(|last| last.with_wheel(0));
        };

        if let Some(last) = *last_delivered {
            while let Some(next) = pending.front() {
                if !candidate.same_transition_as(next) || !next.within(&last, COALESCE_DISTANCE) {
                    break;
                }
                candidate = *next;
                pending.pop_front();
            }
        }

        *last_delivered = Some(candidate);
        Some(candidate)
    }

    // Samples are `Copy` and every critical section is a single push, pop or
    // clear, so a panicking holder cannot leave the queue inconsistent.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
