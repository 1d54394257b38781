//! `EntryReader` — concurrently decodes a [`StreamingEntry`] and drives a
//! [`DownstreamCallback`] (§4.3, §4.4). Many readers may decode the same
//! entry at once; each keeps its own private cursor state, since decoding
//! only ever reads blocks, never mutates the entry.

use crate::backoff::Backoff;
use crate::block::{is_end_of_stream, BLOCK_SIZE};
use crate::callback::DownstreamCallback;
use crate::entry::{Section, StreamingEntry};
use crate::headers::OwnedHeaderMap;
use std::sync::Arc;

/// Outcome of reading the next framed unit from a section.
enum UnitOutcome {
    /// A complete key/value/chunk, not the end-of-stream sentinel.
    Unit(Vec<u8>),
    /// The next block read back was the end-of-stream sentinel: this
    /// section is the one the writer actually finished on.
    EndOfStream,
    /// The section's published total has been reached with no sentinel —
    /// the writer finished on a *different*, later section.
    Done,
}

/// Reads one framed string (key, value, or body chunk) starting at
/// `*index`. Busy-waits on a block that has not been published yet, but
/// only after confirming (via `total_blocks`) that one is still expected —
/// a section the writer finished on without a sentinel (because a later
/// section holds it) publishes a total with no further block ever coming,
/// and this must report [`UnitOutcome::Done`] rather than spin forever.
fn read_framed_unit(section: &Section, index: &mut u64) -> UnitOutcome {
    let mut out = Vec::new();
    let mut backoff = Backoff::new();
    let mut first_block = true;
    loop {
        let mut buf = [0u8; BLOCK_SIZE];
        match section.read_block(*index, &mut buf) {
            Some(size) => {
                backoff.reset();
                *index += 1;
                if first_block && is_end_of_stream(&buf, size) {
                    return UnitOutcome::EndOfStream;
                }
                first_block = false;
                out.extend_from_slice(&buf[..size]);
                if size < BLOCK_SIZE {
                    return UnitOutcome::Unit(out);
                }
            }
            None => {
                if let Some(total) = section.total_blocks() {
                    if *index >= total {
                        return UnitOutcome::Done;
                    }
                }
                backoff.snooze();
            }
        }
    }
}

fn read_pairs(section: &Section) -> (Vec<(Vec<u8>, Vec<u8>)>, bool) {
    let mut index = 0u64;
    let mut units = Vec::new();
    let is_eos = loop {
        match read_framed_unit(section, &mut index) {
            UnitOutcome::Unit(unit) => units.push(unit),
            UnitOutcome::EndOfStream => break true,
            UnitOutcome::Done => break false,
        }
    };
    let mut pairs = Vec::with_capacity(units.len() / 2);
    let mut iter = units.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((key, value));
    }
    (pairs, is_eos)
}

fn pairs_to_header_map(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> OwnedHeaderMap {
    let mut map = OwnedHeaderMap::new();
    for (k, v) in pairs {
        map.push(
            String::from_utf8_lossy(&k).into_owned(),
            String::from_utf8_lossy(&v).into_owned(),
        );
    }
    map
}

/// Decodes one [`StreamingEntry`] and drives a [`DownstreamCallback`] with
/// its contents, busy-waiting on sections that are still being written.
pub struct EntryReader {
    entry: Arc<StreamingEntry>,
}

impl EntryReader {
    /// Creates a reader over `entry`. The entry need not be complete yet —
    /// `drive` streams out blocks as they become available.
    #[must_use]
    pub fn new(entry: Arc<StreamingEntry>) -> Self {
        Self { entry }
    }

    /// Decodes the entire entry, in order, calling `callback` for each
    /// section. Blocks the calling thread (via bounded spin/yield backoff)
    /// until the writer finishes producing whatever this reader is waiting
    /// on next.
    ///
    /// Exactly one callback invocation carries `end_stream = true`, on
    /// whichever section the writer actually finished on (headers-only,
    /// body with no trailers, or trailers) — never a fabricated trailing
    /// call. Because that requires knowing a body chunk is the *last* one
    /// before emitting it, the body loop holds back one chunk at a time,
    /// only emitting it once the next read confirms whether more follow.
    pub fn drive(&self, callback: &mut dyn DownstreamCallback) {
        let (header_pairs, headers_end_stream) = read_pairs(&self.entry.headers);
        callback.emit_headers(pairs_to_header_map(header_pairs), headers_end_stream);
        if headers_end_stream {
            return;
        }

        let mut index = 0u64;
        let mut pending: Option<Vec<u8>> = None;
        let body_end_stream = loop {
            match read_framed_unit(&self.entry.body, &mut index) {
                UnitOutcome::Unit(chunk) => {
                    if let Some(prev) = pending.replace(chunk) {
                        callback.emit_data(&prev, false);
                    }
                }
                UnitOutcome::EndOfStream => {
                    match pending.take() {
                        Some(chunk) => callback.emit_data(&chunk, true),
                        None => callback.emit_data(&[], true),
                    }
                    break true;
                }
                UnitOutcome::Done => {
                    if let Some(chunk) = pending.take() {
                        callback.emit_data(&chunk, false);
                    }
                    break false;
                }
            }
        };
        if body_end_stream {
            return;
        }

        let (trailer_pairs, _trailers_end_stream) = read_pairs(&self.entry.trailers);
        callback.emit_trailers(pairs_to_header_map(trailer_pairs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::UpstreamCallback;
    use crate::error::CacheError;
    use crate::headers::HeaderMap as _;
    use crate::writer::EntryWriter;

    #[derive(Default)]
    struct RecordingCallback {
        headers: Vec<(String, String, bool)>,
        data: Vec<(Vec<u8>, bool)>,
        trailers: Vec<(String, String)>,
        failures: Vec<CacheError>,
    }

    impl DownstreamCallback for RecordingCallback {
        fn emit_headers(&mut self, headers: OwnedHeaderMap, end_stream: bool) {
            for (k, v) in headers.iter() {
                self.headers.push((k.to_string(), v.to_string(), end_stream));
            }
        }
        fn emit_data(&mut self, bytes: &[u8], end_stream: bool) {
            self.data.push((bytes.to_vec(), end_stream));
        }
        fn emit_trailers(&mut self, trailers: OwnedHeaderMap) {
            for (k, v) in trailers.iter() {
                self.trailers.push((k.to_string(), v.to_string()));
            }
        }
        fn emit_failure(&mut self, error: CacheError) {
            self.failures.push(error);
        }
    }

    #[test]
    fn round_trips_headers_body_and_no_trailers() {
        let entry = Arc::new(StreamingEntry::new(16));
        let mut writer = EntryWriter::new(Arc::clone(&entry));

        let mut headers = OwnedHeaderMap::new();
        headers.push(":status", "200");
        headers.push("content-type", "text/plain");
        writer.on_upstream_headers(&headers, false);
        writer.on_upstream_data(b"hello", false);
        writer.on_upstream_data(b" world", true);
        writer.on_upstream_complete();

        let reader = EntryReader::new(Arc::clone(&entry));
        let mut cb = RecordingCallback::default();
        reader.drive(&mut cb);

        let body: Vec<u8> = cb.data.iter().flat_map(|(b, _)| b.clone()).collect();
        assert_eq!(body, b"hello world");
        assert!(cb.data.last().unwrap().1);
        assert!(cb.trailers.is_empty());
    }

    #[test]
    fn round_trips_trailers() {
        let entry = Arc::new(StreamingEntry::new(16));
        let mut writer = EntryWriter::new(Arc::clone(&entry));

        let mut headers = OwnedHeaderMap::new();
        headers.push(":status", "200");
        writer.on_upstream_headers(&headers, false);
        writer.on_upstream_data(b"body", false);

        let mut trailers = OwnedHeaderMap::new();
        trailers.push("x-checksum", "deadbeef");
        writer.on_upstream_trailers(&trailers);
        writer.on_upstream_complete();

        let reader = EntryReader::new(Arc::clone(&entry));
        let mut cb = RecordingCallback::default();
        reader.drive(&mut cb);

        assert_eq!(cb.trailers, vec![("x-checksum".to_string(), "deadbeef".to_string())]);
    }

    #[test]
    fn headers_only_response_has_no_body_bytes() {
        let entry = Arc::new(StreamingEntry::new(16));
        let mut writer = EntryWriter::new(Arc::clone(&entry));
        let mut headers = OwnedHeaderMap::new();
        headers.push(":status", "204");
        writer.on_upstream_headers(&headers, true);

        let reader = EntryReader::new(Arc::clone(&entry));
        let mut cb = RecordingCallback::default();
        reader.drive(&mut cb);

        let body: Vec<u8> = cb.data.iter().flat_map(|(b, _)| b.clone()).collect();
        assert!(body.is_empty());
        assert!(cb.data.is_empty(), "a headers-only response never calls emit_data at all");
        assert!(cb.headers.iter().next().unwrap().2, "end_stream must land on the headers call");
    }

    #[test]
    fn multiple_readers_see_the_same_decoded_content() {
        let entry = Arc::new(StreamingEntry::new(16));
        let mut writer = EntryWriter::new(Arc::clone(&entry));
        let mut headers = OwnedHeaderMap::new();
        headers.push(":status", "200");
        writer.on_upstream_headers(&headers, false);
        writer.on_upstream_data(b"shared payload", true);
        writer.on_upstream_complete();

        for _ in 0..3 {
            let reader = EntryReader::new(Arc::clone(&entry));
            let mut cb = RecordingCallback::default();
            reader.drive(&mut cb);
            let body: Vec<u8> = cb.data.iter().flat_map(|(b, _)| b.clone()).collect();
            assert_eq!(body, b"shared payload");
        }
    }
}
