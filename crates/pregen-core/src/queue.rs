//! Growable ring buffer of chunk keys.
//!
//! Used for the completion and release backlogs. Pushing never fails: when
//! the ring is full its capacity doubles and the live range is unrolled to
//! the front of the new buffer, so FIFO order survives growth.

use crate::key::ChunkKey;

/// Smallest capacity a queue is ever created with.
pub const MIN_CAPACITY: usize = 16;

/// FIFO ring buffer of [`ChunkKey`]s.
#[derive(Debug, Clone)]
pub struct KeyQueue {
    buf: Vec<ChunkKey>,
    head: usize,
    tail: usize,
    len: usize,
}

impl KeyQueue {
    /// Create a queue able to hold at least `capacity` keys before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![ChunkKey::from_raw(0); capacity.max(MIN_CAPACITY)],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append a key, doubling the capacity if the ring is full.
    pub fn push(&mut self, key: ChunkKey) {
        if self.len == self.buf.len() {
            self.grow();
        }
        self.buf[self.tail] = key;
        self.tail = (self.tail + 1) % self.buf.len();
        self.len += 1;
    }

    /// Remove and return the oldest key, or `None` when empty.
    pub fn pop(&mut self) -> Option<ChunkKey> {
        if self.len == 0 {
            return None;
        }
        let key = self.buf[self.head];
        self.head = (self.head + 1) % self.buf.len();
        self.len -= 1;
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn grow(&mut self) {
        let cap = self.buf.len();
        let mut next = Vec::with_capacity(cap << 1);
        next.extend((0..self.len).map(|i| self.buf[(self.head + i) % cap]));
        next.resize(cap << 1, ChunkKey::from_raw(0));
        self.buf = next;
        self.head = 0;
        self.tail = self.len;
    }
}

impl Default for KeyQueue {
    fn default() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(i: i32) -> ChunkKey {
        ChunkKey::pack(i, -i)
    }

    #[test]
    fn empty_queue_pops_none() {
        let mut q = KeyQueue::with_capacity(4);
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
        assert_eq!(q.capacity(), MIN_CAPACITY);
    }

    #[test]
    fn fifo_across_growth() {
        let mut q = KeyQueue::with_capacity(16);
        for i in 0..17 {
            q.push(key(i));
        }
        assert_eq!(q.len(), 17);
        assert_eq!(q.capacity(), 32);
        for i in 0..17 {
            assert_eq!(q.pop(), Some(key(i)));
        }
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn fifo_across_growth_with_wrapped_head() {
        let mut q = KeyQueue::with_capacity(16);
        for i in 0..10 {
            q.push(key(i));
        }
        for i in 0..6 {
            assert_eq!(q.pop(), Some(key(i)));
        }
        // Tail wraps past the end of the buffer before the ring fills.
        for i in 10..30 {
            q.push(key(i));
        }
        let drained: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        let expected: Vec<_> = (6..30).map(key).collect();
        assert_eq!(drained, expected);
    }

    #[test]
    fn interleaved_push_pop_keeps_len() {
        let mut q = KeyQueue::default();
        let mut model = std::collections::VecDeque::new();
        for round in 0..100 {
            for k in [key(round), key(round + 1000)] {
                q.push(k);
                model.push_back(k);
            }
            assert_eq!(q.pop(), model.pop_front());
        }
        assert_eq!(q.len(), 100);
        assert_eq!(q.len(), model.len());
    }
}
