//! Property-based checks of the invariants documented in `SPEC_FULL.md`
//! exercised purely through the public API: streaming roundtrip fidelity
//! and LRU directory bounds. `RingBlockQueue`'s own block-level properties
//! live next to it in `src/ring_queue.rs`, since its read/write methods are
//! crate-internal.

use inline_http_cache::{DownstreamCallback, EntryReader, EntryWriter, OwnedHeaderMap, UpstreamCallback};
use inline_http_cache::{CacheError, LruDirectory, StreamingEntry};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Default)]
struct CollectingCallback {
    body: Vec<u8>,
}

impl DownstreamCallback for CollectingCallback {
    fn emit_headers(&mut self, _headers: OwnedHeaderMap, _end_stream: bool) {}
    fn emit_data(&mut self, bytes: &[u8], _end_stream: bool) {
        self.body.extend_from_slice(bytes);
    }
    fn emit_trailers(&mut self, _trailers: OwnedHeaderMap) {}
    fn emit_failure(&mut self, _error: CacheError) {}
}

proptest! {
    #[test]
    fn body_bytes_survive_writer_reader_roundtrip(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..200), 0..10)) {
        let entry = Arc::new(StreamingEntry::new(8));
        let mut writer = EntryWriter::new(Arc::clone(&entry));

        let mut headers = OwnedHeaderMap::new();
        headers.push(":status", "200");
        writer.on_upstream_headers(&headers, false);

        let last = chunks.len().checked_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            writer.on_upstream_data(chunk, Some(i) == last);
        }
        if last.is_none() {
            writer.on_upstream_data(&[], true);
        }
        writer.on_upstream_complete();

        let mut cb = CollectingCallback::default();
        EntryReader::new(entry).drive(&mut cb);

        let expected: Vec<u8> = chunks.into_iter().flatten().collect();
        prop_assert_eq!(cb.body, expected);
    }

    #[test]
    fn lru_directory_never_exceeds_capacity(capacity in 1usize..8, insertions in 0usize..64) {
        let dir = LruDirectory::new(capacity);
        for i in 0..insertions {
            dir.insert(vec![i as u8], Arc::new(StreamingEntry::new(4)));
            prop_assert!(dir.len() <= capacity);
        }
    }

    #[test]
    fn lru_directory_most_recently_used_key_survives_eviction(capacity in 2usize..8, extra_insertions in 0usize..16) {
        let dir = LruDirectory::new(capacity);
        let protected_key = vec![255u8];
        dir.insert(protected_key.clone(), Arc::new(StreamingEntry::new(4)));

        for i in 0..extra_insertions {
            dir.get(&protected_key);
            dir.insert(vec![i as u8], Arc::new(StreamingEntry::new(4)));
        }

        prop_assert!(dir.get(&protected_key).is_some());
    }
}
