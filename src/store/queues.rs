//! Per-destination FIFO queues with global and per-queue caps.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::debug;

use crate::protocol::Event;

/// Mapping from destination node identifier to its pending events.
///
/// Enforces two invariants under a single mutex: no destination queue ever
/// exceeds `max_per_dest`, and the total across all destinations never
/// exceeds `max_total`. Eviction is always oldest-first. Enqueue and drain
/// are fully serialized; neither holds the lock across any I/O.
pub struct EventQueueStore {
    inner: Mutex<QueueMap>,
    max_per_dest: usize,
    max_total: usize,
}

#[derive(Default)]
struct QueueMap {
    queues: HashMap<String, VecDeque<Event>>,
    total: usize,
}

impl QueueMap {
    /// Evict oldest events until there is room for one more under `max_total`.
    ///
    /// Victim queues are visited in map iteration order and drained
    /// oldest-first; the walk stops as soon as enough space is freed.
    fn make_room(&mut self, max_total: usize) {
        if self.total < max_total {
            return;
        }
        let mut overflow = self.total - max_total + 1;

        for queue in self.queues.values_mut() {
            while overflow > 0 {
                if queue.pop_front().is_none() {
                    break;
                }
                self.total -= 1;
                overflow -= 1;
            }
            if overflow == 0 {
                break;
            }
        }
        self.queues.retain(|_, queue| !queue.is_empty());
    }
}

impl EventQueueStore {
    /// Create a store with the given per-destination and global caps.
    pub fn new(max_per_dest: usize, max_total: usize) -> Self {
        Self {
            inner: Mutex::new(QueueMap::default()),
            max_per_dest,
            max_total,
        }
    }

    /// Append an event to the destination's queue.
    ///
    /// Frees global capacity first, then appends, then trims the front of
    /// the destination queue back to the per-destination cap. Overflowing
    /// events are dropped silently (best-effort delivery).
    pub fn enqueue(&self, to_ref: &str, event: Event) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        inner.make_room(self.max_total);

        let dropped = {
            let queue = inner.queues.entry(to_ref.to_string()).or_default();
            queue.push_back(event);
            let mut dropped = 0usize;
            while queue.len() > self.max_per_dest {
                queue.pop_front();
                dropped += 1;
            }
            dropped
        };
        inner.total = inner.total + 1 - dropped;

        if dropped > 0 {
            debug!(to_ref, dropped, "Destination queue at capacity, evicted oldest");
        }
    }

    /// Remove and return up to `max_count` events from the front of the
    /// destination's queue, in FIFO order.
    ///
    /// This is a destructive read; an absent or empty queue yields an empty
    /// vec. A fully drained queue is removed from the map.
    pub fn drain(&self, to_ref: &str, max_count: usize) -> Vec<Event> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let events: Vec<Event> = match inner.queues.get_mut(to_ref) {
            Some(queue) => {
                let take = queue.len().min(max_count);
                queue.drain(..take).collect()
            }
            None => return Vec::new(),
        };

        inner.total -= events.len();
        if inner.queues.get(to_ref).is_some_and(|q| q.is_empty()) {
            inner.queues.remove(to_ref);
        }

        events
    }

    /// Total events currently held across all destinations.
    pub fn total_events(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).total
    }

    /// Number of pending events for one destination.
    pub fn queue_len(&self, to_ref: &str) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queues
            .get(to_ref)
            .map_or(0, VecDeque::len)
    }
}
