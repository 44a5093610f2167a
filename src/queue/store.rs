//! Queue store interface and the in-memory implementation
//!
//! The store exclusively owns queue membership. Each queue sits behind its
//! own lock, so operations on one queue are linearizable with each other while
//! the killers and victims queues never block one another.

use crate::error::{MatchmakingError, Result};
use crate::types::{PlayerId, QueueEntry, QueueKind, QueueLengths, QueueStatus};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Trait for queue membership storage.
///
/// Implementations must never perform network I/O while holding a queue lock.
pub trait QueueStore: Send + Sync {
    /// Insert an entry; `false` if the identity is already in that queue
    fn add(&self, queue: QueueKind, entry: QueueEntry) -> Result<bool>;

    /// Remove an identity; `false` if it was not present
    fn remove(&self, queue: QueueKind, id: PlayerId) -> Result<bool>;

    /// Remove a killer and a victim together.
    ///
    /// Both entries are removed or neither is: `false` when either identity
    /// is missing from its queue, in which case nothing changes.
    fn remove_pair(&self, killer_id: PlayerId, victim_id: PlayerId) -> Result<bool>;

    /// Snapshot of a queue ordered by `joined_at`, then insertion order
    fn list(&self, queue: QueueKind) -> Result<Vec<QueueEntry>>;

    /// Whether the identity waits in each of the two queues
    fn contains(&self, id: PlayerId) -> Result<QueueStatus>;

    /// Number of entries in a queue
    fn size(&self, queue: QueueKind) -> Result<usize>;

    /// Drop every entry of a queue, returning how many were removed
    fn clear(&self, queue: QueueKind) -> Result<usize>;

    /// Verify the backing storage is reachable
    fn ping(&self) -> Result<()>;

    /// Sizes of both queues
    fn lengths(&self) -> Result<QueueLengths> {
        Ok(QueueLengths {
            killers: self.size(QueueKind::Killers)?,
            victims: self.size(QueueKind::Victims)?,
        })
    }
}

#[derive(Debug, Default)]
struct QueueSlot {
    entries: HashMap<PlayerId, (u64, QueueEntry)>,
    next_seq: u64,
}

/// In-memory queue store with a per-queue lock
#[derive(Debug)]
pub struct InMemoryQueueStore {
    killers: RwLock<QueueSlot>,
    victims: RwLock<QueueSlot>,
    max_entries_per_queue: usize,
}

impl InMemoryQueueStore {
    /// Create a store holding at most `max_entries_per_queue` players per queue
    pub fn new(max_entries_per_queue: usize) -> Self {
        Self {
            killers: RwLock::new(QueueSlot::default()),
            victims: RwLock::new(QueueSlot::default()),
            max_entries_per_queue,
        }
    }

    fn slot(&self, queue: QueueKind) -> &RwLock<QueueSlot> {
        match queue {
            QueueKind::Killers => &self.killers,
            QueueKind::Victims => &self.victims,
        }
    }

    fn read(&self, queue: QueueKind) -> Result<RwLockReadGuard<'_, QueueSlot>> {
        self.slot(queue)
            .read()
            .map_err(|_| MatchmakingError::store_unavailable(queue, "read lock poisoned"))
    }

    fn write(&self, queue: QueueKind) -> Result<RwLockWriteGuard<'_, QueueSlot>> {
        self.slot(queue)
            .write()
            .map_err(|_| MatchmakingError::store_unavailable(queue, "write lock poisoned"))
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl QueueStore for InMemoryQueueStore {
    fn add(&self, queue: QueueKind, entry: QueueEntry) -> Result<bool> {
        let mut slot = self.write(queue)?;

        if slot.entries.contains_key(&entry.id()) {
            return Ok(false);
        }
        if slot.entries.len() >= self.max_entries_per_queue {
            return Err(MatchmakingError::store_unavailable(
                queue,
                format!("capacity of {} entries reached", self.max_entries_per_queue),
            ));
        }

        let seq = slot.next_seq;
        slot.next_seq += 1;
        slot.entries.insert(entry.id(), (seq, entry));
        Ok(true)
    }

    fn remove(&self, queue: QueueKind, id: PlayerId) -> Result<bool> {
        let mut slot = self.write(queue)?;
        Ok(slot.entries.remove(&id).is_some())
    }

    fn remove_pair(&self, killer_id: PlayerId, victim_id: PlayerId) -> Result<bool> {
        // Killers is always locked first; no other operation holds both locks
        let mut killers = self.write(QueueKind::Killers)?;
        let mut victims = self.write(QueueKind::Victims)?;

        if !killers.entries.contains_key(&killer_id) || !victims.entries.contains_key(&victim_id) {
            return Ok(false);
        }
        killers.entries.remove(&killer_id);
        victims.entries.remove(&victim_id);
        Ok(true)
    }

    fn list(&self, queue: QueueKind) -> Result<Vec<QueueEntry>> {
        let slot = self.read(queue)?;
        let mut entries: Vec<_> = slot.entries.values().cloned().collect();
        drop(slot);

        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            a.joined_at()
                .cmp(&b.joined_at())
                .then_with(|| seq_a.cmp(seq_b))
        });
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    fn contains(&self, id: PlayerId) -> Result<QueueStatus> {
        let queued_as_killer = self.read(QueueKind::Killers)?.entries.contains_key(&id);
        let queued_as_victim = self.read(QueueKind::Victims)?.entries.contains_key(&id);
        Ok(QueueStatus {
            queued_as_killer,
            queued_as_victim,
        })
    }

    fn size(&self, queue: QueueKind) -> Result<usize> {
        Ok(self.read(queue)?.entries.len())
    }

    fn clear(&self, queue: QueueKind) -> Result<usize> {
        let mut slot = self.write(queue)?;
        let removed = slot.entries.len();
        slot.entries.clear();
        Ok(removed)
    }

    fn ping(&self) -> Result<()> {
        for queue in QueueKind::ALL {
            self.read(queue)?;
        }
        Ok(())
    }
}
