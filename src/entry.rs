//! `StreamingEntry` — the ordered chain of [`RingBlockQueue`] segments that
//! backs one cached response (§4.2).
//!
//! A section (headers, body, or trailers) starts as a single segment sized
//! by `Config::ring_buffer_capacity`. When a writer fills a segment it
//! appends a fresh one rather than blocking or wrapping — segments are
//! append-only for the lifetime of the entry. Readers walk the chain
//! segment-by-segment, block-by-block, so a reader racing far behind a slow
//! writer still only ever touches published blocks.

use crate::invariants::debug_assert_total_unpublished;
use crate::ring_queue::RingBlockQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

pub(crate) const UNFINALIZED: u64 = crate::block::UNFINALIZED;

/// One append-only chain of same-sized segments, plus the finalized block
/// count once the section is complete.
pub(crate) struct Section {
    segment_capacity: usize,
    segments: RwLock<Vec<RingBlockQueue>>,
    total_blocks: AtomicU64,
}

impl Section {
    fn new(segment_capacity: usize) -> Self {
        Self {
            segment_capacity,
            segments: RwLock::new(vec![RingBlockQueue::new(segment_capacity)]),
            total_blocks: AtomicU64::new(UNFINALIZED),
        }
    }

    /// Appends one block, creating a new segment if the current tail is full.
    pub(crate) fn write_block(&self, payload: &[u8]) {
        loop {
            {
                let segments = self.segments.read().unwrap();
                if let Some(tail) = segments.last() {
                    if tail.write(payload).is_ok() {
                        return;
                    }
                }
            }
            // Tail segment was full (or there wasn't one, which never
            // happens after `new`): append a fresh segment and retry. A
            // section has exactly one writer, so no other thread can be
            // racing to append concurrently.
            let mut segments = self.segments.write().unwrap();
            if segments.last().map_or(true, |s| s.write(payload).is_err()) {
                segments.push(RingBlockQueue::new(self.segment_capacity));
            }
            return;
        }
    }

    /// Marks the section complete at `block_count` total blocks. A section
    /// is finalized exactly once for its whole lifetime.
    pub(crate) fn finalize(&self, block_count: u64) {
        let previous = self.total_blocks.swap(block_count, Ordering::AcqRel);
        debug_assert_total_unpublished!(previous, UNFINALIZED);
    }

    /// Total block count, or `None` if not yet finalized.
    pub(crate) fn total_blocks(&self) -> Option<u64> {
        match self.total_blocks.load(Ordering::Acquire) {
            UNFINALIZED => None,
            n => Some(n),
        }
    }

    /// Reads block `index` (section-relative, across segment boundaries)
    /// into `out`. Returns `None` if that block has not been published yet.
    pub(crate) fn read_block(
        &self,
        index: u64,
        out: &mut [u8; crate::ring_queue::BLOCK_SIZE],
    ) -> Option<usize> {
        let segments = self.segments.read().unwrap();
        let segment_index = (index as usize) / self.segment_capacity;
        let offset = (index as usize) % self.segment_capacity;
        let segment = segments.get(segment_index)?;
        segment.read(offset, out).ok()
    }
}

/// The full per-response entry: three independently framed sections plus
/// the status code gating whether it may ever be served from cache (§4.2,
/// §4.4).
pub struct StreamingEntry {
    pub(crate) headers: Section,
    pub(crate) body: Section,
    pub(crate) trailers: Section,
    status: AtomicU64,
}

/// Sentinel meaning "response headers have not arrived yet".
const NO_STATUS: u64 = 0;

impl StreamingEntry {
    /// Creates a fresh entry whose three sections each start with one
    /// segment of `segment_capacity` blocks.
    #[must_use]
    pub fn new(segment_capacity: usize) -> Self {
        Self {
            headers: Section::new(segment_capacity),
            body: Section::new(segment_capacity),
            trailers: Section::new(segment_capacity),
            status: AtomicU64::new(NO_STATUS),
        }
    }

    /// Records the upstream response's status code. Called exactly once,
    /// before any header blocks are written.
    pub(crate) fn set_status(&self, status: u16) {
        self.status.store(u64::from(status), Ordering::Release);
    }

    /// The recorded status code, if headers have arrived.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.status.load(Ordering::Acquire) {
            NO_STATUS => None,
            s => Some(s as u16),
        }
    }

    /// Whether this entry's status is cacheable (2xx) per §4.4. Returns
    /// `None` until headers have arrived.
    #[must_use]
    pub fn is_cacheable(&self) -> Option<bool> {
        self.status().map(|s| (200..300).contains(&s))
    }

    /// Whether every section has been finalized — the entry is complete and
    /// safe to keep serving indefinitely from cache.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.headers.total_blocks().is_some()
            && self.body.total_blocks().is_some()
            && self.trailers.total_blocks().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_has_no_status_and_is_incomplete() {
        let entry = StreamingEntry::new(4);
        assert_eq!(entry.status(), None);
        assert_eq!(entry.is_cacheable(), None);
        assert!(!entry.is_complete());
    }

    #[test]
    fn status_in_2xx_range_is_cacheable() {
        let entry = StreamingEntry::new(4);
        entry.set_status(204);
        assert_eq!(entry.is_cacheable(), Some(true));
    }

    #[test]
    fn status_outside_2xx_range_is_not_cacheable() {
        let entry = StreamingEntry::new(4);
        entry.set_status(503);
        assert_eq!(entry.is_cacheable(), Some(false));
    }

    #[test]
    fn section_spans_multiple_segments_transparently() {
        let section = Section::new(2);
        for i in 0..5u8 {
            section.write_block(&[i]);
        }
        let mut out = [0u8; crate::ring_queue::BLOCK_SIZE];
        for i in 0..5u8 {
            let n = section.read_block(u64::from(i), &mut out).unwrap();
            assert_eq!(&out[..n], &[i]);
        }
    }

    #[test]
    fn section_read_beyond_written_blocks_is_none() {
        let section = Section::new(2);
        section.write_block(b"a");
        let mut out = [0u8; crate::ring_queue::BLOCK_SIZE];
        assert!(section.read_block(5, &mut out).is_none());
    }

    #[test]
    fn finalize_records_total_blocks() {
        let section = Section::new(4);
        assert_eq!(section.total_blocks(), None);
        section.finalize(3);
        assert_eq!(section.total_blocks(), Some(3));
    }
}
