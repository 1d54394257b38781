use thiserror::Error;

/// Public error surface of the cache core.
///
/// Each variant corresponds to a failure kind in §4.7/§7. `QueueFull` and
/// `NotYetReadable` are deliberately absent here: they are recovered locally
/// by the ring-queue and reader layers and never escape as a `CacheError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    /// A waiter's signal was not observed within the configured coalescing
    /// timeout and the leader never published a `StreamingEntry`.
    #[error("coalescing timeout: leader did not publish a response in time")]
    CoalescingTimeout,

    /// A re-delegated waiter's target group expired (its weak reference
    /// could not be upgraded) before it was drained.
    #[error("coalescing group was abandoned before this waiter could be served")]
    CoalescingAbandoned,

    /// The first response header's `:status` value could not be parsed as
    /// an HTTP status code.
    #[error("response status code could not be parsed")]
    BadStatusCode,

    /// The response status code was not in the `2xx` range.
    #[error("response status {status} is not cacheable")]
    NonSuccessStatus {
        /// The observed status code.
        status: u16,
    },
}

impl CacheError {
    /// Returns `true` if this error should be surfaced to the downstream
    /// request as an upstream-like failure (as opposed to being logged and
    /// otherwise ignored, since the response is still delivered).
    #[inline]
    #[must_use]
    pub fn is_request_fatal(&self) -> bool {
        matches!(self, Self::CoalescingTimeout | Self::CoalescingAbandoned)
    }

    /// Returns `true` if this error only means "do not cache this response",
    /// with delivery to the requester(s) proceeding unaffected.
    #[inline]
    #[must_use]
    pub fn is_cache_bypass_only(&self) -> bool {
        matches!(self, Self::BadStatusCode | Self::NonSuccessStatus { .. })
    }
}

/// Low-level error returned by [`RingBlockQueue::write`] when the queue's
/// segment capacity has been exhausted. Within this crate it is always
/// recovered by `StreamingEntry` appending a fresh segment; it never
/// surfaces as a `CacheError`.
///
/// [`RingBlockQueue::write`]: crate::ring_queue::RingBlockQueue::write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ring block queue is full")]
pub struct QueueFull;

/// Low-level error returned by [`RingBlockQueue::read`] when the requested
/// block has not been published yet. Within this crate it is always
/// recovered by the reader's busy-wait loop; it never surfaces as a
/// `CacheError`.
///
/// [`RingBlockQueue::read`]: crate::ring_queue::RingBlockQueue::read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("block not yet readable")]
pub struct NotYetReadable;
