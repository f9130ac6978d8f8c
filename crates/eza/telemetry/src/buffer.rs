//! Bounded recent-events buffer

use eza_types::TelemetryEvent;
use std::collections::VecDeque;

/// Newest-first ring of recent events.
///
/// Position follows arrival order, never the event's own timestamp. Once
/// full, each push evicts the oldest event.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<TelemetryEvent>,
    capacity: usize,
}

impl EventBuffer {
    /// A buffer holding at most `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: TelemetryEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently received event.
    pub fn latest(&self) -> Option<&TelemetryEvent> {
        self.events.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.events.iter()
    }

    /// Copy of the buffer, newest first.
    pub fn snapshot(&self) -> Vec<TelemetryEvent> {
        self.events.iter().cloned().collect()
    }
}
