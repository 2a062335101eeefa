//! Append-only timer storage for one thread.
//!
//! A [`TimerChain`] is a list of fixed-capacity [`Block`]s. Records are never
//! moved once written: the chain grows by allocating a new block when the open
//! one fills up, and a full block is sealed forever.
//!
//! # Publication
//!
//! ```text
//! producer (ChainWriter, &mut)          consumers (&TimerChain, any thread)
//! ─────────────────────────────         ───────────────────────────────────
//! slots[n].set(record)                  len = block.len.load(Acquire)
//! block.len.store(n + 1, Release)  ──▶  slots[0..len] are all initialized
//! ```
//!
//! Each slot is a `OnceLock`, written exactly once by the single writer. The
//! length is published after the slot, so a reader that observes `len` sees
//! every record below it in full. A reader of the open block sees a prefix of
//! it; a reader of a sealed block (`len == capacity`) sees all of it.
//!
//! The block list itself sits behind a `parking_lot::RwLock` that the writer
//! takes only when a new block is pushed. Readers clone the `Arc`s out of it
//! and iterate without holding the lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use livescope_common::TimerRecord;
use parking_lot::RwLock;

use crate::domain::{IngestError, Tid};

/// Records per block when no capacity is configured.
pub const DEFAULT_BLOCK_CAPACITY: usize = 1024;

// =============================================================================
// BLOCK
// =============================================================================

/// Fixed-capacity, append-only run of timer records.
#[derive(Debug)]
pub struct Block {
    slots: Box<[OnceLock<TimerRecord>]>,
    len: AtomicUsize,
}

impl Block {
    /// Allocate an empty block, reporting allocation failure instead of
    /// aborting the process.
    fn try_with_capacity(capacity: usize) -> Option<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).ok()?;
        slots.resize_with(capacity, OnceLock::new);
        Some(Self { slots: slots.into_boxed_slice(), len: AtomicUsize::new(0) })
    }

    /// Writer side. Hands the record back when the block is full.
    fn push(&self, record: TimerRecord) -> Result<(), TimerRecord> {
        // Only the chain's single writer stores `len`, so a relaxed load reads
        // its own last store.
        let len = self.len.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(len) else {
            return Err(record);
        };
        slot.set(record)?;
        self.len.store(len + 1, Ordering::Release);
        Ok(())
    }

    /// Number of records published so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// A sealed block is full and never changes again.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.len() == self.capacity()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimerRecord> {
        if index < self.len() {
            self.slots[index].get()
        } else {
            None
        }
    }

    /// Iterate the records published when this call was made.
    pub fn iter(&self) -> impl Iterator<Item = &TimerRecord> + '_ {
        let len = self.len();
        self.slots[..len].iter().filter_map(OnceLock::get)
    }
}

// =============================================================================
// CHAIN
// =============================================================================

/// Read side of one thread's timer storage. Shared as `Arc<TimerChain>`.
#[derive(Debug)]
pub struct TimerChain {
    tid: Tid,
    block_capacity: usize,
    blocks: RwLock<Vec<Arc<Block>>>,
}

impl TimerChain {
    /// Create an empty chain and the only writer allowed to append to it.
    ///
    /// # Panics
    ///
    /// Panics if `block_capacity` is zero.
    #[must_use]
    pub fn new(tid: Tid, block_capacity: usize) -> (Arc<TimerChain>, ChainWriter) {
        assert!(block_capacity > 0, "Block capacity must be positive");
        let chain = Arc::new(TimerChain { tid, block_capacity, blocks: RwLock::new(Vec::new()) });
        let writer = ChainWriter { chain: Arc::clone(&chain), open: None };
        (chain, writer)
    }

    #[must_use]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// Snapshot of the blocks that exist now, in creation order.
    ///
    /// Blocks appended after the call are not included. The last block may
    /// still be open and keep growing; its `len()` is always consistent.
    #[must_use]
    pub fn blocks(&self) -> Vec<Arc<Block>> {
        self.blocks.read().clone()
    }

    /// Total records published across all blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().iter().map(|b| b.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every published record in append order.
    ///
    /// The closure receives `(block_index, slot_index, record)`.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, &TimerRecord)) {
        for (block_index, block) in self.blocks().iter().enumerate() {
            for (slot_index, record) in block.iter().enumerate() {
                f(block_index, slot_index, record);
            }
        }
    }

    /// Copy of the record at a position, if it has been published.
    #[must_use]
    pub fn get(&self, block: usize, index: usize) -> Option<TimerRecord> {
        self.blocks.read().get(block).and_then(|b| b.get(index).copied())
    }
}

/// The single writer of a [`TimerChain`].
///
/// Appending takes `&mut self`, so the borrow checker enforces the
/// one-writer-per-chain rule the lock-free read path depends on.
#[derive(Debug)]
pub struct ChainWriter {
    chain: Arc<TimerChain>,
    open: Option<Arc<Block>>,
}

impl ChainWriter {
    /// Append a record, sealing the open block and allocating a fresh one when
    /// it is full.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::BlockAllocation`] if a new block cannot be
    /// allocated. Blocks written before the failure remain readable.
    pub fn append(&mut self, record: TimerRecord) -> Result<(), IngestError> {
        let record = match &self.open {
            Some(block) => match block.push(record) {
                Ok(()) => return Ok(()),
                Err(record) => record,
            },
            None => record,
        };

        let capacity = self.chain.block_capacity;
        let block = Block::try_with_capacity(capacity)
            .map(Arc::new)
            .ok_or(IngestError::BlockAllocation { tid: self.chain.tid, capacity })?;
        // A fresh block has room for at least one record.
        if block.push(record).is_err() {
            return Err(IngestError::BlockAllocation { tid: self.chain.tid, capacity });
        }
        self.chain.blocks.write().push(Arc::clone(&block));
        self.open = Some(block);
        Ok(())
    }
}
