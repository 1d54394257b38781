//! `FilterGlue` — adapts [`LruDirectory`], [`CoalescingCoordinator`], and
//! the framing layer into the per-request operations a host filter chain
//! calls (§5).

use crate::callback::DownstreamCallback;
use crate::callback::UpstreamCallback as _;
use crate::coalescing::{CoalescingCoordinator, LeaderToken};
use crate::config::Config;
use crate::directory::LruDirectory;
use crate::entry::StreamingEntry;
use crate::error::CacheError;
use crate::fingerprint::{compute_fingerprint, Fingerprint};
use crate::headers::HeaderMap;
use crate::reader::EntryReader;
use crate::writer::EntryWriter;
use std::sync::Arc;

/// Handle returned on a cache miss: the caller (the host's upstream fetch
/// driver) feeds upstream events through this until the response completes
/// or the fetch fails, then consumes it via [`Self::finish`] or
/// [`Self::fail`].
pub struct MissHandle {
    writer: EntryWriter,
    entry: Arc<StreamingEntry>,
    fingerprint: Fingerprint,
    token: LeaderToken,
    directory: Arc<LruDirectory>,
    coordinator: Arc<CoalescingCoordinator>,
}

impl MissHandle {
    /// Forwards upstream response headers into the entry being written, then
    /// wakes any already-parked coalesced waiters immediately — they can
    /// busy-wait-decode the rest of the response concurrently with the
    /// upstream fetch still filling it in, rather than block until
    /// [`Self::finish`] (§4.6).
    pub fn on_upstream_headers(&mut self, headers: &dyn HeaderMap, end_stream: bool) {
        self.writer.on_upstream_headers(headers, end_stream);
        self.coordinator.mark_streaming(&self.token);
    }

    /// Forwards an upstream body chunk into the entry being written.
    pub fn on_upstream_data(&mut self, bytes: &[u8], end_stream: bool) {
        self.writer.on_upstream_data(bytes, end_stream);
    }

    /// Forwards upstream trailers into the entry being written.
    pub fn on_upstream_trailers(&mut self, trailers: &dyn HeaderMap) {
        self.writer.on_upstream_trailers(trailers);
    }

    /// Finalizes the entry: inserts it into the directory if its status was
    /// cacheable (§4.4), then publishes to every coalesced waiter
    /// regardless, since a non-cacheable response is still delivered to
    /// everyone who asked for it — only caching it is refused.
    pub fn finish(mut self) {
        self.writer.on_upstream_complete();
        match self.entry.is_cacheable() {
            Some(true) => {
                log::debug!("response is cacheable; inserting into directory");
                self.directory.insert(self.fingerprint.clone(), Arc::clone(&self.entry));
            }
            Some(false) => {
                let status = self.entry.status().unwrap_or(0);
                log::warn!("{}", CacheError::NonSuccessStatus { status });
            }
            None => {}
        }
        self.coordinator.publish(self.token, Ok(()));
    }

    /// Abandons the fetch before a response was ever produced (e.g. the
    /// upstream connection failed). The entry is never cached and every
    /// coalesced waiter is told the fetch failed.
    pub fn fail(self, error: CacheError) {
        log::debug!("upstream fetch failed: {error}");
        self.coordinator.publish(self.token, Err(error));
    }
}

/// Ties a bounded cache directory and a coalescing coordinator into the
/// operations a streaming reverse-proxy filter chain needs per request.
pub struct FilterGlue {
    directory: Arc<LruDirectory>,
    coordinator: Arc<CoalescingCoordinator>,
}

impl FilterGlue {
    /// Builds the cache core from `config` (§4.8).
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            directory: Arc::new(LruDirectory::new(config.cache_capacity())),
            coordinator: Arc::new(CoalescingCoordinator::new(config.coalesce_timeout())),
        }
    }

    /// Handles a downstream request's headers.
    ///
    /// On a cache hit, `downstream` is driven synchronously to completion
    /// and this returns `None` — the caller does nothing further for this
    /// request. On a cache miss, this either fully services `downstream`
    /// via request coalescing (again returning `None`), or returns a
    /// [`MissHandle`] if the caller is the one who must perform the
    /// upstream fetch.
    pub fn on_request_headers(
        &self,
        headers: &dyn HeaderMap,
        path: &str,
        ring_buffer_capacity: usize,
        downstream: Box<dyn DownstreamCallback + Send>,
    ) -> Option<MissHandle> {
        let fingerprint = compute_fingerprint(headers, path);

        if let Some(entry) = self.directory.get(&fingerprint) {
            log::debug!("cache hit for {path}");
            let mut downstream = downstream;
            EntryReader::new(entry).drive(downstream.as_mut());
            return None;
        }
        log::debug!("cache miss for {path}");

        let registration = self
            .coordinator
            .register(fingerprint.clone(), ring_buffer_capacity, downstream);

        registration.map(|(entry, token)| MissHandle {
            writer: EntryWriter::new(Arc::clone(&entry)),
            entry,
            fingerprint,
            token,
            directory: Arc::clone(&self.directory),
            coordinator: Arc::clone(&self.coordinator),
        })
    }
}
