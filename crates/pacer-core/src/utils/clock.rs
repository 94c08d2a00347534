// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time sources for timestamps and cooldowns.
//!
//! Every component that needs "now" takes an `Arc<dyn Clock>` so that the same
//! control logic runs against wall time in production and against a manually
//! advanced clock in tests.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A monotonic source of millisecond timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time in milliseconds since the clock's origin.
    ///
    /// Successive calls never return a smaller value.
    fn now_ms(&self) -> u64;
}

/// A clock backed by `tokio::time::Instant`.
///
/// Follows tokio's virtual time when the runtime is paused, which makes ticker
/// driven tests deterministic.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
///
/// Cloning yields a handle to the same underlying time, so a test can keep one
/// handle and give another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a manual clock starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.now
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }

    /// Moves the clock forward by `delta_ms` milliseconds.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Sets the clock to `now_ms`, ignoring values that would move it backwards.
    pub fn set_ms(&self, now_ms: u64) {
        self.now.fetch_max(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_shared_handles() {
        let clock = ManualClock::new(100);
        let handle = clock.clone();
        clock.advance(Duration::from_secs(2));
        assert_eq!(handle.now_ms(), 2100);
        handle.advance_ms(50);
        assert_eq!(clock.now_ms(), 2150);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(1000);
        clock.set_ms(500);
        assert_eq!(clock.now_ms(), 1000);
        clock.set_ms(1500);
        assert_eq!(clock.now_ms(), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn monotonic_clock_follows_paused_time() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.now_ms(), 0);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now_ms(), 1500);
    }
}
