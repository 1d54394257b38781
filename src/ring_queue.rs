//! `RingBlockQueue` — the lock-free SPMC block channel of §4.1.
//!
//! # Memory ordering protocol
//!
//! **Writer (single producer per queue):**
//! 1. Load `block_counter` (Acquire) and bail with [`QueueFull`] if it has
//!    reached capacity.
//! 2. `fetch_add` the counter (AcqRel) to claim a block index. Because a
//!    queue has exactly one writer for its whole lifetime, this claim never
//!    races with another producer.
//! 3. Flip the claimed block's version to the next even value if it was
//!    previously odd (a block being rewritten... except blocks are never
//!    rewritten here, since `block_counter` only ever grants an index once;
//!    the even/odd flip exists to keep the protocol identical to the
//!    general-purpose SPMC recipe this is built from, where slots *are*
//!    recycled). Compute the target odd version.
//! 4. Publish `size` (Release), copy the payload, then publish the target
//!    version (Release) — the block is now readable.
//!
//! **Reader (many consumers, one position each):**
//! 1. Load the block's version (Acquire).
//! 2. If odd, load `size` (Acquire), copy the payload out, and store
//!    `version + 2` (Release) to acknowledge — this preserves odd parity,
//!    so other concurrent readers of the same block still see it as
//!    readable.
//! 3. If even, return [`NotYetReadable`]; the caller backs off and retries.
use crate::error::{NotYetReadable, QueueFull};
use crate::invariants::{debug_assert_version_monotonic, debug_assert_version_parity};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

pub const BLOCK_SIZE: usize = crate::block::BLOCK_SIZE;

struct RawBlock {
    version: AtomicU32,
    size: AtomicU32,
    data: UnsafeCell<[u8; BLOCK_SIZE]>,
}

impl RawBlock {
    fn new() -> Self {
        Self {
            version: AtomicU32::new(0),
            size: AtomicU32::new(0),
            data: UnsafeCell::new([0u8; BLOCK_SIZE]),
        }
    }
}

// Safety: access to `data` is gated entirely by the version protocol above —
// a writer only touches a slot it just claimed via `fetch_add`, and a reader
// only copies out of a slot whose version it has just observed as odd via
// Acquire. No two parties touch the same slot without an intervening
// Release/Acquire pair on `version`.
unsafe impl Send for RawBlock {}
unsafe impl Sync for RawBlock {}

/// Fixed-capacity, append-only (no wrap-around — see §9) sequence of
/// [`BLOCK_SIZE`]-byte blocks, written by a single producer and readable by
/// arbitrarily many concurrent consumers.
pub struct RingBlockQueue {
    capacity: usize,
    block_counter: CachePadded<AtomicU64>,
    blocks: Box<[RawBlock]>,
}

impl RingBlockQueue {
    /// Creates a new queue with room for `capacity` blocks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring block queue capacity must be positive");
        let mut blocks = Vec::with_capacity(capacity);
        blocks.resize_with(capacity, RawBlock::new);
        Self {
            capacity,
            block_counter: CachePadded::new(AtomicU64::new(0)),
            blocks: blocks.into_boxed_slice(),
        }
    }

    /// Total capacity of this segment.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Writes `payload` (at most [`BLOCK_SIZE`] bytes) into the next block.
    ///
    /// # Panics
    ///
    /// Panics if `payload.len() > BLOCK_SIZE`; callers are responsible for
    /// chunking (the `EntryWriter` framer never produces an oversized
    /// payload).
    pub fn write(&self, payload: &[u8]) -> Result<(), QueueFull> {
        assert!(payload.len() <= BLOCK_SIZE, "payload exceeds block size");

        let n = self.block_counter.load(Ordering::Acquire);
        if n as usize >= self.capacity {
            return Err(QueueFull);
        }
        let index = self.block_counter.fetch_add(1, Ordering::AcqRel);
        if index as usize >= self.capacity {
            return Err(QueueFull);
        }

        let block = &self.blocks[index as usize];
        let current = block.version.load(Ordering::Acquire);
        let target = if current % 2 == 1 {
            block.version.store(current + 1, Ordering::Release);
            current + 2
        } else {
            current + 1
        };
        debug_assert_version_monotonic!(current, target);
        debug_assert_version_parity!(target, true);

        block.size.store(payload.len() as u32, Ordering::Release);
        // Safety: this slot was just claimed by this single writer via the
        // fetch_add above; no reader observes it until `version` publishes
        // `target` below.
        unsafe {
            let dst = &mut (&mut *block.data.get())[..payload.len()];
            dst.copy_from_slice(payload);
        }
        block.version.store(target, Ordering::Release);
        Ok(())
    }

    /// Reads the block at `index` into `out`, returning the number of valid
    /// bytes written to `out` on success.
    pub fn read(&self, index: usize, out: &mut [u8; BLOCK_SIZE]) -> Result<usize, NotYetReadable> {
        let block = &self.blocks[index];
        let version = block.version.load(Ordering::Acquire);
        if version % 2 == 1 {
            debug_assert_version_parity!(version, true);
            let size = block.size.load(Ordering::Acquire) as usize;
            // Safety: odd version publishes a fully-written payload of
            // `size` bytes (Release in `write`, paired with this Acquire).
            unsafe {
                out[..size].copy_from_slice(&(&*block.data.get())[..size]);
            }
            let acked = version + 2;
            debug_assert_version_monotonic!(version, acked);
            debug_assert_version_parity!(acked, true);
            block.version.store(acked, Ordering::Release);
            Ok(size)
        } else {
            Err(NotYetReadable)
        }
    }
}
