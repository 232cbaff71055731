//! Global runtime configuration for builder and traversal behavior.
//!
//! This module provides thread-safe global configuration that affects
//! parsing and walking semantics without adding overhead to hot loops,
//! the same way the original bedtools-compatible flag worked: set once at
//! startup, read with a cheap atomic load in the hot path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Default cycle-guard ring buffer size (§4.9).
pub const DEFAULT_MAX_CYCLE_LEN: usize = 1024;

/// Strict mode: an unrecognized base aborts the build with `InvalidBase`
/// instead of silently ending the current contig.
static STRICT_MODE: AtomicBool = AtomicBool::new(false);

/// Cycle-guard ring buffer capacity used by the traversal engine.
static MAX_CYCLE_LEN: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_CYCLE_LEN);

/// Enable or disable strict mode.
///
/// When enabled, the graph builder treats any byte outside `ACGTacgt` as
/// an `InvalidInput` error. When disabled (the default), the current
/// contig simply ends at the offending base, matching §4.4's non-strict
/// behavior.
#[inline]
pub fn set_strict_mode(enabled: bool) {
    STRICT_MODE.store(enabled, Ordering::Release);
}

/// Check whether strict mode is enabled.
#[inline]
pub fn is_strict_mode() -> bool {
    STRICT_MODE.load(Ordering::Acquire)
}

/// Set the cycle-guard ring buffer capacity used by new [`crate::traversal::Walker`]s.
#[inline]
pub fn set_max_cycle_len(len: usize) {
    MAX_CYCLE_LEN.store(len.max(1), Ordering::Release);
}

/// Current cycle-guard ring buffer capacity.
#[inline]
pub fn max_cycle_len() -> usize {
    MAX_CYCLE_LEN.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_non_strict() {
        set_strict_mode(false);
        assert!(!is_strict_mode());
    }

    #[test]
    fn strict_mode_round_trips() {
        set_strict_mode(true);
        assert!(is_strict_mode());
        set_strict_mode(false); // reset for other tests
    }

    #[test]
    fn max_cycle_len_defaults_and_updates() {
        set_max_cycle_len(DEFAULT_MAX_CYCLE_LEN);
        assert_eq!(max_cycle_len(), DEFAULT_MAX_CYCLE_LEN);
        set_max_cycle_len(64);
        assert_eq!(max_cycle_len(), 64);
        set_max_cycle_len(DEFAULT_MAX_CYCLE_LEN); // reset
    }

    #[test]
    fn max_cycle_len_floors_at_one() {
        set_max_cycle_len(0);
        assert_eq!(max_cycle_len(), 1);
        set_max_cycle_len(DEFAULT_MAX_CYCLE_LEN); // reset
    }
}
