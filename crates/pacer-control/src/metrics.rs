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

//! The rolling window the controller decides from.

use pacer_core::{PerformanceSnapshot, RingBuffer};

/// Number of FPS samples averaged by the policy.
pub const FPS_WINDOW: usize = 30;

/// What the policy sees: a smoothed frame rate plus the latest readings.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyInputs {
    /// Average FPS over the window, `None` until a snapshot with measured
    /// frames has been seen.
    pub average_fps: Option<f64>,
    /// Memory pressure of the latest snapshot.
    pub memory_pressure: f64,
    /// Underruns counted since the last adaptation.
    pub audio_underruns: u64,
    /// Audio latency of the latest snapshot, in milliseconds.
    pub audio_latency_ms: f64,
    /// Battery level, `None` when the device has no battery reading.
    pub battery_level: Option<f64>,
    /// Whether the device is charging.
    pub is_charging: bool,
}

/// Rolling FPS samples plus the most recent snapshot.
///
/// Snapshots without measured frames contribute no FPS sample: their
/// defaulted `fps` of 0 is an absence, not a collapse.
///
/// The audio underrun counter in snapshots is cumulative, so the window keeps
/// a baseline that is moved forward on every adaptation.
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
    fps: RingBuffer<f64, FPS_WINDOW>,
    latest: Option<PerformanceSnapshot>,
    underrun_baseline: u64,
}

impl SampleWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot.
    pub fn push(&mut self, snapshot: &PerformanceSnapshot) {
        if snapshot.rendering.has_frames() {
            self.fps.push(snapshot.rendering.fps);
        }
        // A counter that went backwards belongs to a new audio context.
        if snapshot.audio.underruns < self.underrun_baseline {
            self.underrun_baseline = 0;
        }
        self.latest = Some(snapshot.clone());
    }

    /// Number of FPS samples held.
    pub fn len(&self) -> usize {
        self.fps.count()
    }

    /// `true` before the first snapshot.
    pub fn is_empty(&self) -> bool {
        self.fps.is_empty()
    }

    /// Average FPS over the window, `None` while it holds no sample.
    pub fn average_fps(&self) -> Option<f64> {
        (!self.fps.is_empty()).then(|| self.fps.average())
    }

    /// The most recent snapshot.
    pub fn latest(&self) -> Option<&PerformanceSnapshot> {
        self.latest.as_ref()
    }

    /// Forgets the FPS samples gathered under the previous profile and moves
    /// the underrun baseline to the current count.
    pub fn restart(&mut self) {
        self.fps.clear();
        if let Some(latest) = &self.latest {
            self.underrun_baseline = latest.audio.underruns;
        }
    }

    /// Builds the policy inputs, `None` before the first snapshot.
    pub fn inputs(&self) -> Option<PolicyInputs> {
        let latest = self.latest.as_ref()?;
        // After a restart the window may be empty until the next push.
        let average_fps = self
            .average_fps()
            .or_else(|| latest.rendering.has_frames().then_some(latest.rendering.fps));
        Some(PolicyInputs {
            average_fps,
            memory_pressure: latest.memory.pressure(),
            audio_underruns: latest.audio.underruns.saturating_sub(self.underrun_baseline),
            audio_latency_ms: latest.audio.latency,
            battery_level: latest.battery_level(),
            is_charging: latest.is_charging(),
        })
    }
}
