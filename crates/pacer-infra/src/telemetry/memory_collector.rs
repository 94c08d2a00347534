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

//! Heap usage collector with leak-trend detection.

use async_trait::async_trait;
use pacer_core::platform::{HeapStats, MemoryIntrospector};
use pacer_core::telemetry::{CollectorResult, MemoryMetrics, MetricCollector, PartialSnapshot};
use pacer_core::utils::clock::{Clock, MonotonicClock};
use pacer_core::utils::ring_buffer::linear_regression_slope;
use pacer_core::utils::sync::lock_or_recover;
use pacer_core::RingBuffer;
use std::fmt;
use std::sync::{Arc, Mutex};

const TREND_WINDOW: usize = 60;

/// Tunables for [`MemoryCollector`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCollectorOptions {
    /// Heap limit assumed when the host cannot report one, in bytes.
    pub estimated_heap_limit: u64,
    /// Estimated size of one texture, in bytes.
    pub texture_bytes: u64,
    /// Estimated size of one geometry buffer, in bytes.
    pub geometry_bytes: u64,
    /// Estimated size of one shader program, in bytes.
    pub program_bytes: u64,
    /// Growth rate above which the trend counts as a leak, in bytes per second.
    pub leak_threshold_bytes_per_sec: f64,
    /// Samples required before the trend is evaluated.
    pub min_trend_samples: usize,
}

impl Default for MemoryCollectorOptions {
    fn default() -> Self {
        Self {
            estimated_heap_limit: 2 * 1024 * 1024 * 1024,
            texture_bytes: 1024 * 1024,
            geometry_bytes: 100 * 1024,
            program_bytes: 50 * 1024,
            leak_threshold_bytes_per_sec: 100.0 * 1024.0,
            min_trend_samples: 10,
        }
    }
}

/// Resources the application reports as currently allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    /// Live textures.
    pub textures: u64,
    /// Live geometry buffers.
    pub geometries: u64,
    /// Live materials.
    pub materials: u64,
    /// Live shader programs.
    pub programs: u64,
}

/// Result of the heap-growth regression.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryTrend {
    /// Least-squares growth of heap usage, in bytes per second.
    pub slope_bytes_per_sec: f64,
    /// Set while the slope exceeds the leak threshold.
    pub leak_suspected: bool,
    /// Samples in the regression window.
    pub samples: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    counts: ResourceCounts,
    // (seconds, heap bytes)
    samples: RingBuffer<(f64, f64), TREND_WINDOW>,
    trend: MemoryTrend,
}

/// Samples heap usage.
///
/// Reads the host's numbers through a [`MemoryIntrospector`] when one is
/// supplied and it answers; otherwise estimates usage from the tracked
/// [`ResourceCounts`]. Every sample feeds a rolling regression; a sustained
/// positive slope above the threshold is reported as a suspected leak.
pub struct MemoryCollector {
    options: MemoryCollectorOptions,
    introspector: Option<Arc<dyn MemoryIntrospector>>,
    clock: Arc<dyn Clock>,
    state: Mutex<MemoryState>,
}

impl fmt::Debug for MemoryCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCollector")
            .field("options", &self.options)
            .field("has_introspector", &self.introspector.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new(MemoryCollectorOptions::default())
    }
}

impl MemoryCollector {
    /// Creates a collector that estimates usage from resource counts.
    pub fn new(options: MemoryCollectorOptions) -> Self {
        Self {
            options,
            introspector: None,
            clock: Arc::new(MonotonicClock::new()),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Reads heap numbers from `introspector`.
    pub fn with_introspector(mut self, introspector: Arc<dyn MemoryIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Timestamps trend samples with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the tracked resource counts.
    pub fn set_resource_counts(&self, counts: ResourceCounts) {
        lock_or_recover(&self.state).counts = counts;
    }

    /// The tracked resource counts.
    pub fn resource_counts(&self) -> ResourceCounts {
        lock_or_recover(&self.state).counts
    }

    /// The latest trend evaluation.
    pub fn trend(&self) -> MemoryTrend {
        lock_or_recover(&self.state).trend
    }

    fn estimate(&self, counts: &ResourceCounts) -> HeapStats {
        let used = counts.textures * self.options.texture_bytes
            + counts.geometries * self.options.geometry_bytes
            + counts.programs * self.options.program_bytes;
        HeapStats {
            used,
            total: used,
            limit: self.options.estimated_heap_limit,
        }
    }

    fn gpu_estimate(&self, counts: &ResourceCounts) -> Option<u64> {
        let bytes = counts.textures * self.options.texture_bytes
            + counts.geometries * self.options.geometry_bytes;
        (bytes > 0).then_some(bytes)
    }

    /// Takes one sample and updates the trend.
    pub fn sample(&self) -> MemoryMetrics {
        let reported = self.introspector.as_ref().and_then(|i| i.heap_stats());
        let now_secs = self.clock.now_ms() as f64 / 1000.0;

        let mut state = lock_or_recover(&self.state);
        let counts = state.counts;
        let heap = reported.unwrap_or_else(|| self.estimate(&counts));

        state.samples.push((now_secs, heap.used as f64));
        state.trend = self.evaluate_trend(&state.samples, state.trend.leak_suspected);

        MemoryMetrics {
            heap_used: heap.used,
            heap_total: heap.total,
            heap_limit: heap.limit,
            gpu_memory: self.gpu_estimate(&counts),
            textures: counts.textures,
            geometries: counts.geometries,
            materials: counts.materials,
        }
    }

    fn evaluate_trend(
        &self,
        samples: &RingBuffer<(f64, f64), TREND_WINDOW>,
        was_leaking: bool,
    ) -> MemoryTrend {
        let count = samples.count();
        if count < self.options.min_trend_samples {
            return MemoryTrend {
                samples: count,
                ..MemoryTrend::default()
            };
        }
        let slope = linear_regression_slope(samples.iter().copied()).unwrap_or(0.0);
        let leak_suspected = slope > 0.0 && slope > self.options.leak_threshold_bytes_per_sec;
        if leak_suspected && !was_leaking {
            log::warn!(
                "MemoryCollector: heap growing at {:.0} B/s over {} samples, possible leak.",
                slope,
                count
            );
        } else if !leak_suspected && was_leaking {
            log::info!("MemoryCollector: heap growth back under threshold.");
        }
        MemoryTrend {
            slope_bytes_per_sec: slope,
            leak_suspected,
            samples: count,
        }
    }
}

#[async_trait]
impl MetricCollector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> CollectorResult<()> {
        if let Some(introspector) = &self.introspector {
            if introspector.heap_stats().is_none() {
                log::info!(
                    "MemoryCollector: host heap stats unavailable, estimating from resources."
                );
            }
        }
        Ok(())
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::memory(self.sample()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pacer_core::utils::clock::ManualClock;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Heap that grows by a fixed step on every read.
    struct GrowingHeap {
        used: AtomicU64,
        step: u64,
    }

    impl MemoryIntrospector for GrowingHeap {
        fn heap_stats(&self) -> Option<HeapStats> {
            let used = self.used.fetch_add(self.step, Ordering::SeqCst);
            Some(HeapStats {
                used,
                total: used * 2,
                limit: 4 * 1024 * 1024 * 1024,
            })
        }
    }

    struct NoHeap;

    impl MemoryIntrospector for NoHeap {
        fn heap_stats(&self) -> Option<HeapStats> {
            None
        }
    }

    fn growing(step: u64) -> Arc<GrowingHeap> {
        Arc::new(GrowingHeap {
            used: AtomicU64::new(100 * 1024 * 1024),
            step,
        })
    }

    #[test]
    fn estimates_from_resource_counts() {
        let collector = MemoryCollector::default();
        collector.set_resource_counts(ResourceCounts {
            textures: 10,
            geometries: 20,
            materials: 5,
            programs: 4,
        });

        let metrics = collector.sample();
        let expected = 10 * 1024 * 1024 + 20 * 100 * 1024 + 4 * 50 * 1024;
        assert_eq!(metrics.heap_used, expected);
        assert_eq!(metrics.heap_limit, 2 * 1024 * 1024 * 1024);
        assert_eq!(metrics.materials, 5);
        assert_eq!(metrics.gpu_memory, Some(10 * 1024 * 1024 + 20 * 100 * 1024));
    }

    #[test]
    fn falls_back_when_introspector_is_silent() {
        let collector = MemoryCollector::default().with_introspector(Arc::new(NoHeap));
        collector.set_resource_counts(ResourceCounts {
            textures: 1,
            ..Default::default()
        });
        assert_eq!(collector.sample().heap_used, 1024 * 1024);
    }

    #[test]
    fn no_resources_means_no_gpu_estimate() {
        let metrics = MemoryCollector::default().sample();
        assert_eq!(metrics.heap_used, 0);
        assert_eq!(metrics.gpu_memory, None);
    }

    #[test]
    fn steady_growth_is_flagged_as_leak() {
        let clock = ManualClock::new(0);
        let collector = MemoryCollector::default()
            .with_introspector(growing(1024 * 1024))
            .with_clock(Arc::new(clock.clone()));

        for _ in 0..9 {
            collector.sample();
            clock.advance_ms(1_000);
        }
        assert!(!collector.trend().leak_suspected);

        collector.sample();
        let trend = collector.trend();
        assert!(trend.leak_suspected);
        assert_relative_eq!(trend.slope_bytes_per_sec, 1024.0 * 1024.0, epsilon = 1e-3);
        assert_eq!(trend.samples, 10);
    }

    #[test]
    fn slow_growth_is_not_a_leak() {
        let clock = ManualClock::new(0);
        let collector = MemoryCollector::default()
            .with_introspector(growing(1024))
            .with_clock(Arc::new(clock.clone()));

        for _ in 0..20 {
            collector.sample();
            clock.advance_ms(1_000);
        }
        let trend = collector.trend();
        assert!(!trend.leak_suspected);
        assert!(trend.slope_bytes_per_sec > 0.0);
    }

    #[test]
    fn introspector_numbers_take_precedence() {
        let collector = MemoryCollector::default().with_introspector(growing(0));
        collector.set_resource_counts(ResourceCounts {
            textures: 500,
            ..Default::default()
        });
        let metrics = collector.sample();
        assert_eq!(metrics.heap_used, 100 * 1024 * 1024);
        assert_eq!(metrics.heap_limit, 4 * 1024 * 1024 * 1024);
    }
}
