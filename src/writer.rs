//! `EntryWriter` — frames an upstream response into a [`StreamingEntry`]
//! (§4.3).
//!
//! Framing scheme:
//! - A header or trailer **string** (key or value) is encoded as zero or
//!   more full ([`BLOCK_SIZE`]-byte) blocks followed by exactly one
//!   terminator block strictly shorter than `BLOCK_SIZE` (possibly empty).
//!   The terminator's short size is itself the end-of-string marker, so no
//!   separate delimiter byte is needed.
//! - A header/trailer pair is a key string immediately followed by a value
//!   string, with no extra framing between pairs.
//! - The **body** reuses the same string framing per `on_upstream_data`
//!   call (so a reader can reconstruct chunk boundaries if it cares to).
//! - Exactly one section — whichever one the response actually ends on
//!   (headers alone, body with no trailers, or trailers) — gets one extra
//!   full block of [`END_OF_STREAM_PAYLOAD`] appended after its last
//!   legitimate unit, immediately before it is finalized. A reader detects
//!   it the same way it detects a normal unit boundary: by finding a full,
//!   all-`0x01` block where the next key/value/chunk would otherwise start.

use crate::block::{BLOCK_SIZE, END_OF_STREAM_PAYLOAD};
use crate::callback::UpstreamCallback;
use crate::entry::{Section, StreamingEntry};
use crate::error::CacheError;
use crate::headers::HeaderMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn write_framed_string(section: &Section, counter: &mut u64, bytes: &[u8]) {
    let mut i = 0;
    while bytes.len() - i >= BLOCK_SIZE {
        section.write_block(&bytes[i..i + BLOCK_SIZE]);
        *counter += 1;
        i += BLOCK_SIZE;
    }
    section.write_block(&bytes[i..]);
    *counter += 1;
}

fn write_header_map(section: &Section, counter: &mut u64, headers: &dyn HeaderMap) {
    for (name, value) in headers.iter() {
        write_framed_string(section, counter, name.as_bytes());
        write_framed_string(section, counter, value.as_bytes());
    }
}

fn parse_status(headers: &dyn HeaderMap) -> Result<u16, CacheError> {
    let raw = headers
        .get(":status")
        .or_else(|| headers.get("status"))
        .ok_or(CacheError::BadStatusCode)?;
    raw.parse::<u16>().map_err(|_| CacheError::BadStatusCode)
}

/// Drives upstream response events into a [`StreamingEntry`]'s three
/// sections, one writer per entry for its whole lifetime (§4.3).
pub struct EntryWriter {
    entry: Arc<StreamingEntry>,
    header_blocks: u64,
    body_blocks: u64,
    trailer_blocks: u64,
    body_finalized: AtomicBool,
    trailers_finalized: AtomicBool,
}

impl EntryWriter {
    /// Creates a writer for a freshly constructed, unpublished entry.
    #[must_use]
    pub fn new(entry: Arc<StreamingEntry>) -> Self {
        Self {
            entry,
            header_blocks: 0,
            body_blocks: 0,
            trailer_blocks: 0,
            body_finalized: AtomicBool::new(false),
            trailers_finalized: AtomicBool::new(false),
        }
    }

    /// Finalizes the body section, optionally writing the end-of-stream
    /// sentinel into it first. `write_sentinel` is true only when the body
    /// is the section the writer actually finished the response on; a
    /// no-op past the first call, since headers, data-with-end-stream, and
    /// the completion safety net can all race to finalize body depending on
    /// which section actually turned out to be terminal.
    fn finalize_body(&mut self, write_sentinel: bool) {
        if self.body_finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        if write_sentinel {
            self.entry.body.write_block(&END_OF_STREAM_PAYLOAD);
            self.body_blocks += 1;
        }
        self.entry.body.finalize(self.body_blocks);
    }

    /// Finalizes the trailers section, optionally writing the end-of-stream
    /// sentinel into it first. See [`Self::finalize_body`].
    fn finalize_trailers(&mut self, write_sentinel: bool) {
        if self.trailers_finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        if write_sentinel {
            self.entry.trailers.write_block(&END_OF_STREAM_PAYLOAD);
            self.trailer_blocks += 1;
        }
        self.entry.trailers.finalize(self.trailer_blocks);
    }
}

impl UpstreamCallback for EntryWriter {
    fn on_upstream_headers(&mut self, headers: &dyn HeaderMap, end_stream: bool) {
        match parse_status(headers) {
            Ok(status) => self.entry.set_status(status),
            Err(_) => {
                log::warn!("{}", CacheError::BadStatusCode);
                self.entry.set_status(0);
            }
        }
        write_header_map(&self.entry.headers, &mut self.header_blocks, headers);
        if end_stream {
            // Headers are the terminal section: no body or trailers will
            // ever be written, so the end-of-stream sentinel belongs here.
            self.entry.headers.write_block(&END_OF_STREAM_PAYLOAD);
            self.header_blocks += 1;
        }
        self.entry.headers.finalize(self.header_blocks);

        if end_stream {
            self.finalize_body(false);
            self.finalize_trailers(false);
        }
    }

    fn on_upstream_data(&mut self, bytes: &[u8], end_stream: bool) {
        write_framed_string(&self.entry.body, &mut self.body_blocks, bytes);
        if end_stream {
            // `end_stream` on a data frame means no trailers follow, so
            // body is the terminal section.
            self.finalize_body(true);
            self.finalize_trailers(false);
        }
    }

    fn on_upstream_trailers(&mut self, trailers: &dyn HeaderMap) {
        // Trailers always come after the body is done, and trailers are
        // always the terminal section once they exist.
        self.finalize_body(false);
        write_header_map(&self.entry.trailers, &mut self.trailer_blocks, trailers);
        self.finalize_trailers(true);
    }

    fn on_upstream_complete(&mut self) {
        // Safety net for a caller that never passed `end_stream = true`
        // anywhere: whichever section isn't finalized yet becomes terminal
        // here. `finalize_body`/`finalize_trailers` are no-ops once a
        // section already finalized itself above.
        self.finalize_body(true);
        self.finalize_trailers(false);
        debug_assert!(self.entry.is_complete(), "entry left unfinalized at completion");
    }
}
