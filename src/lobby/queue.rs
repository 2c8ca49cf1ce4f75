use std::collections::VecDeque;

pub const QUEUE_CAPACITY: usize = 64;

/// Fixed-capacity FIFO of received game payloads. A push onto a full queue
/// evicts the oldest entry.
#[derive(Debug)]
pub struct MessageQueue {
    entries: VecDeque<String>,
    capacity: usize,
    dropped: u64,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }
}

impl MessageQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Returns the evicted payload, if any.
    pub fn push(&mut self, payload: String) -> Option<String> {
        let evicted = if self.entries.len() == self.capacity {
            self.dropped += 1;
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(payload);
        evicted
    }

    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
