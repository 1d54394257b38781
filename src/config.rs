use std::time::Duration;

/// Validated configuration for the cache core.
///
/// Mirrors the recognized options of §6: ring queue capacity, directory
/// capacity, and the coalescing wait timeout. Decoding these from host
/// configuration (e.g. protobuf/xDS) is glue that lives outside this crate;
/// `Config` only owns validation of the already-decoded values.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    ring_buffer_capacity: usize,
    cache_capacity: usize,
    coalesce_timeout: Duration,
}

impl Config {
    /// Creates a new configuration, validating every field.
    ///
    /// # Panics
    ///
    /// Panics if `ring_buffer_capacity` or `cache_capacity` is zero, or if
    /// `coalesce_timeout` is zero. A host's config-loading glue is expected
    /// to reject malformed configuration before it reaches this point; a
    /// zero here is a programmer error, not a runtime condition to recover
    /// from.
    #[must_use]
    pub fn new(ring_buffer_capacity: usize, cache_capacity: usize, coalesce_timeout: Duration) -> Self {
        assert!(ring_buffer_capacity > 0, "ring_buffer_capacity must be positive");
        assert!(cache_capacity > 0, "cache_capacity must be positive");
        assert!(!coalesce_timeout.is_zero(), "coalesce_timeout must be positive");

        Self {
            ring_buffer_capacity,
            cache_capacity,
            coalesce_timeout,
        }
    }

    /// Blocks per `RingBlockQueue` segment (§3: typical 1031).
    #[inline]
    #[must_use]
    pub fn ring_buffer_capacity(&self) -> usize {
        self.ring_buffer_capacity
    }

    /// Maximum number of directory entries before LRU eviction kicks in.
    #[inline]
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// How long a waiter parks before surfacing `CoalescingTimeout`.
    #[inline]
    #[must_use]
    pub fn coalesce_timeout(&self) -> Duration {
        self.coalesce_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_buffer_capacity: 1031,
            cache_capacity: 1024,
            coalesce_timeout: Duration::from_secs(5),
        }
    }
}

/// Preset tuned for low-memory deployments: small per-segment ring and a
/// tight directory.
pub fn small_cache_config() -> Config {
    Config::new(128, 64, Duration::from_secs(5))
}

/// Preset tuned for high fan-out edge proxies: larger segments and a
/// larger resident directory.
pub fn large_cache_config() -> Config {
    Config::new(4096, 16384, Duration::from_secs(5))
}
