//! Debug assertion macros for the invariants documented in `SPEC_FULL.md`.
//!
//! These macros are only active in debug builds (`#[cfg(debug_assertions)]`),
//! so they carry zero overhead in release builds.

// =============================================================================
// INV-BLK-01: Version Parity
// =============================================================================

/// Assert that a block version has the expected parity after a protocol step.
///
/// **Invariant**: odd version == readable snapshot, even version == writer in
/// progress. Used in `RingBlockQueue::write` and `::read`.
macro_rules! debug_assert_version_parity {
    ($version:expr, $expect_odd:expr) => {
        debug_assert!(
            ($version % 2 == 1) == $expect_odd,
            "INV-BLK-01 violated: version {} has unexpected parity (expected odd={})",
            $version,
            $expect_odd
        )
    };
}

// =============================================================================
// INV-BLK-02: Monotonic Version
// =============================================================================

/// Assert that a block's version only increases across a write/read step.
macro_rules! debug_assert_version_monotonic {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new > $old,
            "INV-BLK-02 violated: version went from {} to {}",
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-SEC-01: Single Publication of section_total
// =============================================================================

/// Assert that a section total is only ever published once.
macro_rules! debug_assert_total_unpublished {
    ($current:expr, $sentinel:expr) => {
        debug_assert!(
            $current == $sentinel,
            "INV-SEC-01 violated: section_total published twice (was {}, sentinel {})",
            $current,
            $sentinel
        )
    };
}

// =============================================================================
// INV-LRU-01: Map/List Size Consistency
// =============================================================================

/// Assert that the LRU map and access-order list agree on size.
macro_rules! debug_assert_lru_consistent {
    ($map_len:expr, $list_len:expr, $capacity:expr) => {
        debug_assert!(
            $map_len == $list_len,
            "INV-LRU-01 violated: map has {} entries, list has {}",
            $map_len,
            $list_len
        );
        debug_assert!(
            $map_len <= $capacity,
            "INV-LRU-01 violated: {} entries exceeds capacity {}",
            $map_len,
            $capacity
        )
    };
}

// =============================================================================
// INV-COAL-01: No Worker Waits On Its Own Leadership
// =============================================================================

/// Assert that a worker never becomes a signal-waiter for a group it leads.
macro_rules! debug_assert_no_self_wait {
    ($leader_id:expr, $current_worker:expr) => {
        debug_assert!(
            $leader_id != $current_worker,
            "INV-COAL-01 violated: worker {:?} about to wait on its own leadership",
            $current_worker
        )
    };
}

pub(crate) use debug_assert_lru_consistent;
pub(crate) use debug_assert_no_self_wait;
pub(crate) use debug_assert_total_unpublished;
pub(crate) use debug_assert_version_monotonic;
pub(crate) use debug_assert_version_parity;
