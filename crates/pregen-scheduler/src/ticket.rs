//! Completion tickets and the handler pool behind them.
//!
//! Every dispatched chunk occupies one slot of a [`HandlerPool`] and is
//! represented to the host by an owned [`CompletionTicket`]. Consuming
//! the ticket (or dropping it) sends exactly one [`Completion`] into the
//! job's inbox; the job frees the slot when it drains that message.
//!
//! ```text
//! dispatch:  slot = pool.acquire(key)      in_flight += 1
//! host:      ticket.complete() | fail() | drop
//! tick:      inbox → pool.release(slot)    in_flight -= 1
//! ```

use pregen_core::ChunkKey;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How a dispatched unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The chunk is loaded and ready for its post action.
    Completed,
    /// The host gave up on the chunk.
    Failed,
}

/// Message delivered to the job's inbox for one dispatched unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub slot: u32,
    pub outcome: Outcome,
}

pub type Inbox = UnboundedReceiver<Completion>;
pub type Outbox = UnboundedSender<Completion>;

/// Create a connected outbox/inbox pair.
pub fn inbox() -> (Outbox, Inbox) {
    mpsc::unbounded_channel()
}

/// Handle the host uses to report that one requested chunk is finished.
///
/// Reports exactly once: [`complete`](Self::complete) and
/// [`fail`](Self::fail) consume the ticket, and dropping an unreported
/// ticket reports [`Outcome::Failed`].
#[derive(Debug)]
pub struct CompletionTicket {
    slot: u32,
    key: ChunkKey,
    tx: Option<Outbox>,
}

impl CompletionTicket {
    pub(crate) fn new(slot: u32, key: ChunkKey, tx: Outbox) -> Self {
        Self { slot, key, tx: Some(tx) }
    }

    /// The chunk this ticket was issued for.
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn complete(mut self) {
        self.report(Outcome::Completed);
    }

    pub fn fail(mut self) {
        self.report(Outcome::Failed);
    }

    fn report(&mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            // A closed inbox means the job is gone; nothing left to account.
            let _ = tx.send(Completion { slot: self.slot, outcome });
        }
    }
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        self.report(Outcome::Failed);
    }
}

/// Free-list of reusable handler slots.
///
/// A slot holds its key while armed and is cleared when released.
#[derive(Debug, Default)]
pub struct HandlerPool {
    slots: Vec<Option<ChunkKey>>,
    free: Vec<u32>,
}

impl HandlerPool {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self::default();
        pool.grow_to(capacity);
        pool
    }

    /// Ensure at least `target` slots exist.
    pub fn grow_to(&mut self, target: usize) {
        while self.slots.len() < target {
            self.free.push(self.slots.len() as u32);
            self.slots.push(None);
        }
    }

    /// Arm a free slot with `key`, growing the pool if none is free.
    pub fn acquire(&mut self, key: ChunkKey) -> u32 {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as u32
            }
        };
        self.slots[slot as usize] = Some(key);
        slot
    }

    /// Clear an armed slot and return it to the free list.
    ///
    /// Returns the key it held, or `None` if the slot was not armed.
    pub fn release(&mut self, slot: u32) -> Option<ChunkKey> {
        let key = self.slots.get_mut(slot as usize)?.take()?;
        self.free.push(slot);
        Some(key)
    }

    /// Slots currently armed.
    pub fn armed(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
