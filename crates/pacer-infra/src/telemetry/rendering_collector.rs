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

//! Frame-time based rendering collector.

use async_trait::async_trait;
use pacer_core::platform::RenderStatsSource;
use pacer_core::telemetry::{CollectorResult, MetricCollector, PartialSnapshot, RenderingMetrics};
use pacer_core::utils::sync::lock_or_recover;
use pacer_core::RingBuffer;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Frame budget at 60 FPS, in milliseconds. Slower frames count as dropped.
pub const FRAME_BUDGET_MS: f64 = 1000.0 / 60.0;

const FRAME_WINDOW: usize = 60;

#[derive(Debug, Default)]
struct RenderingState {
    frame_times: RingBuffer<f64, FRAME_WINDOW>,
    frame_start: Option<Instant>,
    dropped_frames: u64,
    render_time: Option<f64>,
    // 1-second counter
    window_frames: u32,
    window_elapsed_ms: f64,
    window_fps: f64,
}

impl RenderingState {
    fn record(&mut self, frame_time_ms: f64) {
        self.frame_times.push(frame_time_ms);
        if frame_time_ms > FRAME_BUDGET_MS {
            self.dropped_frames += 1;
        }
        self.window_frames += 1;
        self.window_elapsed_ms += frame_time_ms;
        if self.window_elapsed_ms >= 1000.0 {
            self.window_fps = f64::from(self.window_frames) * 1000.0 / self.window_elapsed_ms;
            self.window_frames = 0;
            self.window_elapsed_ms = 0.0;
        }
    }

    fn fps(&self) -> f64 {
        let average = self.frame_times.average();
        let from_average = if average > 0.0 { 1000.0 / average } else { 0.0 };
        from_average.max(self.window_fps)
    }
}

/// Samples frame pacing.
///
/// The host marks frame boundaries with [`begin_frame`](Self::begin_frame) /
/// [`end_frame`](Self::end_frame), or reports durations it measured itself
/// through [`record_frame`](Self::record_frame). The last 60 frame times are
/// kept. FPS is the larger of the rolling-average rate and the rate counted
/// over the last full second of frames.
pub struct RenderingCollector {
    state: Mutex<RenderingState>,
    stats: Option<Arc<dyn RenderStatsSource>>,
}

impl fmt::Debug for RenderingCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderingCollector")
            .field("has_stats_source", &self.stats.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for RenderingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderingCollector {
    /// Creates a collector without renderer counters.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RenderingState::default()),
            stats: None,
        }
    }

    /// Creates a collector that also reads draw calls, triangles and GPU time
    /// from `source`.
    pub fn with_stats_source(source: Arc<dyn RenderStatsSource>) -> Self {
        Self {
            stats: Some(source),
            ..Self::new()
        }
    }

    /// Marks the start of a frame.
    pub fn begin_frame(&self) {
        lock_or_recover(&self.state).frame_start = Some(Instant::now());
    }

    /// Marks the end of the frame started by the last
    /// [`begin_frame`](Self::begin_frame). Ignored without a matching start.
    pub fn end_frame(&self) {
        let mut state = lock_or_recover(&self.state);
        if let Some(start) = state.frame_start.take() {
            let elapsed = start.elapsed().as_secs_f64() * 1000.0;
            state.record(elapsed);
        }
    }

    /// Records a frame duration measured by the host, in milliseconds.
    /// Negative and non-finite values are ignored.
    pub fn record_frame(&self, frame_time_ms: f64) {
        if !frame_time_ms.is_finite() || frame_time_ms < 0.0 {
            log::debug!("RenderingCollector: ignoring frame time {}", frame_time_ms);
            return;
        }
        lock_or_recover(&self.state).record(frame_time_ms);
    }

    /// Records the CPU time spent issuing the last frame. Without it the
    /// latest frame time is reported as render time.
    pub fn record_render_time(&self, render_time_ms: f64) {
        if render_time_ms.is_finite() && render_time_ms >= 0.0 {
            lock_or_recover(&self.state).render_time = Some(render_time_ms);
        }
    }

    /// Current FPS estimate.
    pub fn fps(&self) -> f64 {
        lock_or_recover(&self.state).fps()
    }

    /// Frames slower than [`FRAME_BUDGET_MS`] since creation or the last reset.
    pub fn dropped_frames(&self) -> u64 {
        lock_or_recover(&self.state).dropped_frames
    }

    /// Forgets every recorded frame.
    pub fn reset(&self) {
        *lock_or_recover(&self.state) = RenderingState::default();
    }

    /// Builds the rendering sub-record from the current state.
    pub fn sample(&self) -> RenderingMetrics {
        let counters = self.stats.as_ref().map(|s| s.counters()).unwrap_or_default();
        let state = lock_or_recover(&self.state);
        RenderingMetrics {
            fps: state.fps(),
            frame_times: state.frame_times.to_vec(),
            dropped_frames: state.dropped_frames,
            render_time: state
                .render_time
                .or_else(|| state.frame_times.latest())
                .unwrap_or(0.0),
            gpu_time: counters.gpu_time_ms,
            draw_calls: counters.draw_calls,
            triangles: counters.triangles,
        }
    }
}

#[async_trait]
impl MetricCollector for RenderingCollector {
    fn name(&self) -> &str {
        "rendering"
    }

    async fn cleanup(&self) -> CollectorResult<()> {
        lock_or_recover(&self.state).frame_start = None;
        Ok(())
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::rendering(self.sample()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pacer_core::platform::RendererCounters;
    use std::time::Duration;

    struct FixedCounters;

    impl RenderStatsSource for FixedCounters {
        fn counters(&self) -> RendererCounters {
            RendererCounters {
                draw_calls: 120,
                triangles: 45_000,
                gpu_time_ms: Some(4.5),
            }
        }
    }

    #[test]
    fn empty_collector_reports_zero() {
        let collector = RenderingCollector::new();
        let metrics = collector.sample();
        assert_eq!(metrics.fps, 0.0);
        assert!(metrics.frame_times.is_empty());
        assert_eq!(metrics.render_time, 0.0);
    }

    #[test]
    fn steady_frames_yield_matching_fps() {
        let collector = RenderingCollector::new();
        for _ in 0..30 {
            collector.record_frame(20.0);
        }
        assert_relative_eq!(collector.fps(), 50.0);
        assert_eq!(collector.dropped_frames(), 30);
    }

    #[test]
    fn only_frames_over_budget_are_dropped() {
        let collector = RenderingCollector::new();
        collector.record_frame(16.0);
        collector.record_frame(16.6);
        collector.record_frame(17.0);
        collector.record_frame(33.3);
        assert_eq!(collector.dropped_frames(), 2);
    }

    #[test]
    fn keeps_last_sixty_frames() {
        let collector = RenderingCollector::new();
        for i in 0..100 {
            collector.record_frame(f64::from(i));
        }
        let metrics = collector.sample();
        assert_eq!(metrics.frame_times.len(), 60);
        assert_eq!(metrics.frame_times.first(), Some(&40.0));
        assert_eq!(metrics.frame_times.last(), Some(&99.0));
    }

    #[test]
    fn fps_takes_the_more_optimistic_estimate() {
        let collector = RenderingCollector::new();
        // One second of fast frames sets the counter rate to 100 FPS.
        for _ in 0..100 {
            collector.record_frame(10.0);
        }
        // A short slow burst pulls the rolling average down.
        for _ in 0..30 {
            collector.record_frame(25.0);
        }
        assert_relative_eq!(collector.fps(), 100.0);
    }

    #[test]
    fn invalid_frame_times_are_ignored() {
        let collector = RenderingCollector::new();
        collector.record_frame(-1.0);
        collector.record_frame(f64::NAN);
        assert!(collector.sample().frame_times.is_empty());
    }

    #[test]
    fn renderer_counters_are_reported() {
        let collector = RenderingCollector::with_stats_source(Arc::new(FixedCounters));
        collector.record_frame(16.0);
        collector.record_render_time(6.0);
        let metrics = collector.sample();
        assert_eq!(metrics.draw_calls, 120);
        assert_eq!(metrics.triangles, 45_000);
        assert_eq!(metrics.gpu_time, Some(4.5));
        assert_eq!(metrics.render_time, 6.0);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_markers_measure_elapsed_time() {
        let collector = RenderingCollector::new();
        collector.begin_frame();
        tokio::time::sleep(Duration::from_millis(20)).await;
        collector.end_frame();
        collector.end_frame();

        let metrics = collector.sample();
        assert_eq!(metrics.frame_times.len(), 1);
        assert!(metrics.frame_times[0] >= 20.0);
        assert_eq!(metrics.dropped_frames, 1);
    }

    #[tokio::test]
    async fn collect_returns_only_rendering() {
        let collector = RenderingCollector::new();
        collector.record_frame(16.0);
        let fragment = collector.collect().await.unwrap();
        assert!(fragment.rendering.is_some());
        assert!(fragment.memory.is_none());
        assert!(fragment.audio.is_none());
    }
}
