//! Transposition tables for perft node counts.
//!
//! Entries are keyed by `(position hash, remaining depth)` and hold the number of leaf
//! nodes below that position. All tables are shared by reference across perft workers,
//! so every operation takes `&self`.
//!
//! Two encodings are provided:
//! - [`LocklessPerftTable`] packs each entry into two atomic words and detects torn
//!   writes with an XOR tag, so a race shows up as a miss and never as a wrong count.
//! - [`LockedPerftTable`] guards each slot with its own mutex.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Depth is packed into the low four bits of a lockless entry.
const DEPTH_BITS: u32 = 4;
const DEPTH_MASK: u64 = (1 << DEPTH_BITS) - 1;

/// Counts must leave room for the depth bits.
const MAX_COUNT: u64 = u64::MAX >> DEPTH_BITS;

/// Largest power of two that is at most `n`, and at least 1.
pub fn greatest_power_of_two_at_most(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

/// Perft node-count cache shared between threads.
pub trait PerftTable: Send + Sync {
    /// Cached count for `hash` at exactly `depth` plies remaining.
    fn lookup(&self, hash: u64, depth: u32) -> Option<u64>;

    /// Record a count, replacing whatever occupied the slot.
    fn store(&self, hash: u64, depth: u32, count: u64);

    fn clear(&self);

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Percentage of slots holding an entry.
    fn fill_rate(&self) -> f64;
}

// =============================================================================
// Lockless
// =============================================================================

/// One slot of the lockless table. `tag` is `hash ^ data` so that a slot whose two
/// words come from different writes fails the hash check.
#[derive(Default)]
struct AtomicEntry {
    tag: AtomicU64,
    data: AtomicU64,
}

pub struct LocklessPerftTable {
    entries: Vec<AtomicEntry>,
    mask: u64,
}

impl LocklessPerftTable {
    /// Create a table with the largest power-of-two number of slots not above `capacity`.
    pub fn new(capacity: usize) -> Self {
        let size = greatest_power_of_two_at_most(capacity);
        let entries = (0..size).map(|_| AtomicEntry::default()).collect();
        LocklessPerftTable {
            entries,
            mask: (size - 1) as u64,
        }
    }

    #[inline(always)]
    fn slot(&self, hash: u64) -> &AtomicEntry {
        &self.entries[(hash & self.mask) as usize]
    }
}

impl PerftTable for LocklessPerftTable {
    #[inline]
    fn lookup(&self, hash: u64, depth: u32) -> Option<u64> {
        let entry = self.slot(hash);
        let tag = entry.tag.load(Ordering::Relaxed);
        let data = entry.data.load(Ordering::Relaxed);

        let count = data >> DEPTH_BITS;
        if tag ^ data == hash && data & DEPTH_MASK == depth as u64 && count != 0 {
            Some(count)
        } else {
            None
        }
    }

    #[inline]
    fn store(&self, hash: u64, depth: u32, count: u64) {
        if depth as u64 > DEPTH_MASK || count > MAX_COUNT {
            return;
        }
        let data = (count << DEPTH_BITS) | depth as u64;
        let entry = self.slot(hash);
        entry.tag.store(hash ^ data, Ordering::Relaxed);
        entry.data.store(data, Ordering::Relaxed);
    }

    fn clear(&self) {
        for entry in &self.entries {
            entry.tag.store(0, Ordering::Relaxed);
            entry.data.store(0, Ordering::Relaxed);
        }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn fill_rate(&self) -> f64 {
        let used = self
            .entries
            .iter()
            .filter(|e| e.data.load(Ordering::Relaxed) != 0)
            .count();
        (used as f64) / (self.entries.len() as f64) * 100.0
    }
}

// =============================================================================
// Locked
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PerftEntry {
    hash: u64,
    depth: u32,
    count: u64,
}

pub struct LockedPerftTable {
    entries: Vec<Mutex<Option<PerftEntry>>>,
    mask: u64,
}

impl LockedPerftTable {
    pub fn new(capacity: usize) -> Self {
        let size = greatest_power_of_two_at_most(capacity);
        let entries = (0..size).map(|_| Mutex::new(None)).collect();
        LockedPerftTable {
            entries,
            mask: (size - 1) as u64,
        }
    }

    #[inline(always)]
    fn slot(&self, hash: u64) -> std::sync::MutexGuard<'_, Option<PerftEntry>> {
        // a panicking writer cannot leave a slot half-written, so poison is harmless
        self.entries[(hash & self.mask) as usize]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PerftTable for LockedPerftTable {
    fn lookup(&self, hash: u64, depth: u32) -> Option<u64> {
        match *self.slot(hash) {
            Some(entry) if entry.hash == hash && entry.depth == depth => Some(entry.count),
            _ => None,
        }
    }

    fn store(&self, hash: u64, depth: u32, count: u64) {
        *self.slot(hash) = Some(PerftEntry { hash, depth, count });
    }

    fn clear(&self) {
        for i in 0..self.entries.len() {
            *self.slot(i as u64) = None;
        }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn fill_rate(&self) -> f64 {
        let used = (0..self.entries.len())
            .filter(|&i| self.slot(i as u64).is_some())
            .count();
        (used as f64) / (self.entries.len() as f64) * 100.0
    }
}

// =============================================================================
// Disabled
// =============================================================================

/// A table that never remembers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPerftTable;

impl PerftTable for NoPerftTable {
    #[inline(always)]
    fn lookup(&self, _hash: u64, _depth: u32) -> Option<u64> {
        None
    }

    #[inline(always)]
    fn store(&self, _hash: u64, _depth: u32, _count: u64) {}

    fn clear(&self) {}

    fn capacity(&self) -> usize {
        0
    }

    fn fill_rate(&self) -> f64 {
        0.0
    }
}
