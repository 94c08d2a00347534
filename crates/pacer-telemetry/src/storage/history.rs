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

//! Bounded, time-ordered snapshot history.

use pacer_core::telemetry::PerformanceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Snapshots ordered by timestamp, bounded both by count and by age relative
/// to the newest entry.
#[derive(Debug, Clone)]
pub struct PerformanceHistory {
    entries: VecDeque<PerformanceSnapshot>,
    max_length: usize,
    time_range_ms: u64,
}

impl PerformanceHistory {
    /// Creates an empty history. A `max_length` of zero is treated as one.
    pub fn new(max_length: usize, time_range_ms: u64) -> Self {
        let max_length = max_length.max(1);
        Self {
            entries: VecDeque::with_capacity(max_length.min(1024)),
            max_length,
            time_range_ms,
        }
    }

    /// Appends a snapshot and evicts whatever falls outside the bounds.
    ///
    /// A snapshot older than the newest entry is re-stamped with the newest
    /// timestamp so the sequence stays non-decreasing.
    pub fn push(&mut self, mut snapshot: PerformanceSnapshot) {
        if let Some(newest) = self.entries.back() {
            if snapshot.timestamp < newest.timestamp {
                log::debug!(
                    "History received an out-of-order snapshot ({} < {}), clamping.",
                    snapshot.timestamp,
                    newest.timestamp
                );
                snapshot.timestamp = newest.timestamp;
            }
        }
        self.entries.push_back(snapshot);
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_length {
            self.entries.pop_front();
        }
        let Some(newest) = self.entries.back().map(|s| s.timestamp) else {
            return;
        };
        let cutoff = newest.saturating_sub(self.time_range_ms);
        while self
            .entries
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.entries.pop_front();
        }
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> Option<&PerformanceSnapshot> {
        self.entries.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PerformanceSnapshot> {
        self.entries.iter()
    }

    /// Snapshots with `timestamp >= since_ms`, oldest first.
    pub fn since(&self, since_ms: u64) -> Vec<PerformanceSnapshot> {
        self.entries
            .iter()
            .filter(|s| s.timestamp >= since_ms)
            .cloned()
            .collect()
    }

    /// All snapshots, oldest first.
    pub fn to_vec(&self) -> Vec<PerformanceSnapshot> {
        self.entries.iter().cloned().collect()
    }

    /// Drops every stored snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Aggregates the stored snapshots.
    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::from_snapshots(self.entries.iter())
    }
}

/// Aggregate statistics over a run of snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Snapshots aggregated.
    pub sample_count: usize,
    /// Time covered, newest minus oldest timestamp, in milliseconds.
    pub duration_ms: u64,
    /// Mean frame rate.
    pub average_fps: f64,
    /// Lowest frame rate.
    pub min_fps: f64,
    /// Highest frame rate.
    pub max_fps: f64,
    /// Mean memory pressure.
    pub average_memory_pressure: f64,
    /// Highest memory pressure.
    pub peak_memory_pressure: f64,
    /// Mean audio latency in milliseconds.
    pub average_audio_latency: f64,
    /// Dropped frames reported by the newest snapshot.
    pub dropped_frames: u64,
    /// Audio underruns reported by the newest snapshot.
    pub audio_underruns: u64,
}

impl PerformanceSummary {
    /// Aggregates `snapshots`, which are expected oldest first.
    pub fn from_snapshots<'a, I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = &'a PerformanceSnapshot>,
    {
        let mut summary = PerformanceSummary {
            min_fps: f64::INFINITY,
            max_fps: f64::NEG_INFINITY,
            ..Default::default()
        };
        let mut first_ts = None;
        let mut fps_total = 0.0;
        let mut pressure_total = 0.0;
        let mut latency_total = 0.0;

        for snapshot in snapshots {
            first_ts.get_or_insert(snapshot.timestamp);
            summary.sample_count += 1;
            summary.duration_ms = snapshot
                .timestamp
                .saturating_sub(first_ts.unwrap_or(snapshot.timestamp));

            let fps = snapshot.rendering.fps;
            fps_total += fps;
            summary.min_fps = summary.min_fps.min(fps);
            summary.max_fps = summary.max_fps.max(fps);

            let pressure = snapshot.memory.pressure();
            pressure_total += pressure;
            summary.peak_memory_pressure = summary.peak_memory_pressure.max(pressure);

            latency_total += snapshot.audio.latency;
            summary.dropped_frames = snapshot.rendering.dropped_frames;
            summary.audio_underruns = snapshot.audio.underruns;
        }

        if summary.sample_count == 0 {
            return PerformanceSummary::default();
        }
        let n = summary.sample_count as f64;
        summary.average_fps = fps_total / n;
        summary.average_memory_pressure = pressure_total / n;
        summary.average_audio_latency = latency_total / n;
        summary
    }
}
