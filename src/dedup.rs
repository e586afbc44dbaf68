//! Processed-webhook-event tracking.
//!
//! Webhook providers deliver at-least-once and retry on timeouts and non-2xx
//! responses, so every receiver must treat a repeated event id as a no-op.
//! Entries live in-process with a bounded TTL; a restart forfeits history,
//! which at worst repeats a log line or an SMS within the provider's retry
//! window.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct ProcessedEvents {
    seen: DashMap<String, Instant>,
    ttl: Duration,
}

impl ProcessedEvents {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Records `event_id` and reports whether this is its first delivery.
    /// An expired entry counts as first delivery again.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        self.sweep_expired();

        let now = Instant::now();
        match self.seen.entry(event_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if now.duration_since(*entry.get()) > self.ttl {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Drops an id so the provider's retry is treated as a first delivery.
    /// Used when processing fails after the id was recorded.
    pub fn forget(&self, event_id: &str) {
        self.seen.remove(event_id);
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        self.seen
            .retain(|_, inserted_at| now.duration_since(*inserted_at) <= self.ttl);
    }
}
