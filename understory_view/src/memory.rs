// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Safety pool: a memory reserve released on allocation failure.
//!
//! ## Overview
//!
//! Region arithmetic during painting and invalidation allocates. When an allocation
//! fails, the tree releases a reserve block held by the [`SafetyPool`] and retries
//! the operation once. If the retry fails too, the caller takes a coarser fallback
//! (bounding boxes, overdraw) instead of aborting.
//!
//! Once the reserve is gone the pool reports [`SafetyPool::low_memory`] until it is
//! refilled, which the program attempts when it is idle and whenever views are
//! destroyed. Applications poll `low_memory` before creating large views.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

/// Reserve size used by [`SafetyPool::default`].
pub const DEFAULT_SAFETY_POOL_BYTES: usize = 4096;

/// Memory reserve with a low-memory signal.
#[derive(Debug)]
pub struct SafetyPool {
    reserve: Option<Vec<u8>>,
    size: usize,
    low_memory: bool,
}

impl Default for SafetyPool {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_POOL_BYTES)
    }
}

impl SafetyPool {
    /// Create a pool and try to allocate a reserve of `size` bytes.
    pub fn new(size: usize) -> Self {
        let mut pool = Self {
            reserve: None,
            size,
            low_memory: false,
        };
        if !pool.refill() {
            pool.low_memory = true;
        }
        pool
    }

    /// Size of the reserve in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true while the reserve is held.
    pub fn has_reserve(&self) -> bool {
        self.reserve.is_some()
    }

    /// Returns true once the reserve has been spent and not yet refilled.
    pub fn low_memory(&self) -> bool {
        self.low_memory
    }

    /// Run a fallible allocation, spending the reserve to retry it once on failure.
    ///
    /// Returns `None` if the operation failed even after the retry (or with no reserve
    /// left to spend). `op` must leave its target unchanged when it fails.
    pub fn attempt<T>(
        &mut self,
        mut op: impl FnMut() -> Result<T, TryReserveError>,
    ) -> Option<T> {
        match op() {
            Ok(value) => return Some(value),
            Err(err) => {
                self.low_memory = true;
                let Some(reserve) = self.reserve.take() else {
                    tracing::warn!(%err, "allocation failed with no safety reserve left");
                    return None;
                };
                drop(reserve);
                tracing::warn!(%err, size = self.size, "allocation failed; released safety reserve");
            }
        }
        op().ok()
    }

    /// Try to reacquire the reserve; clears the low-memory signal on success.
    pub fn refill(&mut self) -> bool {
        if self.reserve.is_some() {
            return true;
        }
        let mut reserve = Vec::new();
        if reserve.try_reserve_exact(self.size).is_err() {
            return false;
        }
        self.reserve = Some(reserve);
        if self.low_memory {
            tracing::debug!(size = self.size, "safety reserve refilled");
        }
        self.low_memory = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overflow() -> TryReserveError {
        Vec::<u8>::new()
            .try_reserve(usize::MAX)
            .expect_err("usize::MAX bytes cannot be reserved")
    }

    #[test]
    fn success_leaves_reserve_untouched() {
        let mut pool = SafetyPool::new(64);
        assert_eq!(pool.attempt(|| Ok::<_, TryReserveError>(7)), Some(7));
        assert!(pool.has_reserve());
        assert!(!pool.low_memory());
    }

    #[test]
    fn failure_spends_reserve_and_retries_once() {
        let mut pool = SafetyPool::new(64);
        let mut calls = 0;
        let out = pool.attempt(|| {
            calls += 1;
            if calls == 1 { Err(overflow()) } else { Ok(calls) }
        });
        assert_eq!(out, Some(2));
        assert!(!pool.has_reserve());
        assert!(pool.low_memory());

        assert!(pool.refill());
        assert!(pool.has_reserve());
        assert!(!pool.low_memory());
    }

    #[test]
    fn persistent_failure_yields_none() {
        let mut pool = SafetyPool::new(64);
        let mut calls = 0;
        let out: Option<()> = pool.attempt(|| {
            calls += 1;
            Err(overflow())
        });
        assert_eq!(out, None);
        assert_eq!(calls, 2);

        // Without a reserve there is nothing to retry with.
        calls = 0;
        let out: Option<()> = pool.attempt(|| {
            calls += 1;
            Err(overflow())
        });
        assert_eq!(out, None);
        assert_eq!(calls, 1);
    }
}
