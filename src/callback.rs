use crate::headers::OwnedHeaderMap;

/// Thin convenience trait for host byte-buffer types that are not already
/// `AsRef<[u8]>` (§6). No ownership of the underlying bytes is retained
/// past the call.
pub trait ByteView {
    /// Returns a contiguous view of this buffer's bytes.
    fn as_bytes(&self) -> &[u8];
}

impl<T: AsRef<[u8]>> ByteView for T {
    fn as_bytes(&self) -> &[u8] {
        self.as_ref()
    }
}

/// The per-request sink an `EntryReader` drives (§6): either the original
/// cache-miss requester or a coalesced waiter/hit.
pub trait DownstreamCallback {
    /// Delivers decoded response headers.
    fn emit_headers(&mut self, headers: OwnedHeaderMap, end_stream: bool);

    /// Delivers a decoded body chunk.
    fn emit_data(&mut self, bytes: &[u8], end_stream: bool);

    /// Delivers decoded trailers.
    fn emit_trailers(&mut self, trailers: OwnedHeaderMap);

    /// Called when the request should be treated as a failed upstream
    /// fetch (`CacheError::CoalescingTimeout` / `CoalescingAbandoned`). The
    /// host is expected to translate this into an error response (e.g.
    /// 504) on its own terms; the core does not construct one.
    fn emit_failure(&mut self, error: crate::error::CacheError);
}

/// The per-miss-request event stream an upstream fetch drives into the
/// `EntryWriter` (§6).
pub trait UpstreamCallback {
    /// Called once the upstream response headers have arrived.
    fn on_upstream_headers(&mut self, headers: &dyn crate::headers::HeaderMap, end_stream: bool);

    /// Called for each upstream body chunk.
    fn on_upstream_data(&mut self, bytes: &[u8], end_stream: bool);

    /// Called once upstream trailers have arrived.
    fn on_upstream_trailers(&mut self, trailers: &dyn crate::headers::HeaderMap);

    /// Called once the upstream response has fully completed.
    fn on_upstream_complete(&mut self);
}
