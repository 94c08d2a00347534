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

//! The performance snapshot and the fragments collectors contribute to it.
//!
//! A [`PerformanceSnapshot`] bundles everything known about the application's
//! performance at one instant. Every numeric field is non-negative; the
//! monitor guarantees timestamps never decrease within a run.

use serde::{Deserialize, Serialize};

/// Rendering-side measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderingMetrics {
    /// Frames per second.
    pub fps: f64,
    /// The most recent frame durations in milliseconds, oldest first.
    pub frame_times: Vec<f64>,
    /// Frames that exceeded the 60 FPS budget since the collector started.
    pub dropped_frames: u64,
    /// Duration of the last frame in milliseconds.
    pub render_time: f64,
    /// GPU time for the last frame in milliseconds, when the renderer reports it.
    pub gpu_time: Option<f64>,
    /// Draw calls issued in the last frame.
    pub draw_calls: u64,
    /// Triangles submitted in the last frame.
    pub triangles: u64,
}

impl RenderingMetrics {
    /// `true` once the collector has measured at least one frame. A defaulted
    /// group (no rendering collector, or one that failed this tick) has none.
    pub fn has_frames(&self) -> bool {
        !self.frame_times.is_empty()
    }

    /// Average of the retained frame times, or 0.0 without samples.
    pub fn average_frame_time(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64
    }
}

/// Heap and resource usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    /// Bytes of heap currently in use.
    pub heap_used: u64,
    /// Bytes of heap currently reserved.
    pub heap_total: u64,
    /// Upper bound the heap may grow to.
    pub heap_limit: u64,
    /// Estimated bytes of GPU memory held by tracked resources.
    pub gpu_memory: Option<u64>,
    /// Live texture count.
    pub textures: u64,
    /// Live geometry count.
    pub geometries: u64,
    /// Live material count.
    pub materials: u64,
}

impl MemoryMetrics {
    /// Ratio of used heap to its limit, or 0.0 when the limit is unknown.
    pub fn pressure(&self) -> f64 {
        if self.heap_limit == 0 {
            return 0.0;
        }
        self.heap_used as f64 / self.heap_limit as f64
    }
}

/// Lifecycle state of the audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioContextState {
    /// Created but not producing sound, or paused.
    #[default]
    Suspended,
    /// Actively rendering audio.
    Running,
    /// Permanently shut down.
    Closed,
}

/// Audio pipeline measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMetrics {
    /// Output latency in milliseconds.
    pub latency: f64,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Buffer underruns observed since the collector started.
    pub underruns: u64,
    /// Current context state.
    pub context_state: AudioContextState,
    /// Sample rate in Hz, 0 when no context is attached.
    pub sample_rate: u32,
}

/// Coarse class of network connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// Not reported by the platform.
    #[default]
    Unknown,
    /// Very slow cellular.
    Slow2g,
    /// 2G cellular.
    #[serde(rename = "2g")]
    Cellular2g,
    /// 3G cellular.
    #[serde(rename = "3g")]
    Cellular3g,
    /// 4G or faster.
    #[serde(rename = "4g")]
    Cellular4g,
    /// Wi-Fi or wired.
    Wifi,
}

/// Screen orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Taller than wide.
    #[default]
    Portrait,
    /// Wider than tall.
    Landscape,
}

/// Mobile/device measurements, only present on mobile-classified devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MobileMetrics {
    /// Battery charge in `[0.0, 1.0]`, `None` when the platform hides it.
    pub battery_level: Option<f64>,
    /// `true` while connected to power.
    pub is_charging: bool,
    /// Effective connection type.
    pub network_type: NetworkType,
    /// Estimated downlink in Mbit/s.
    pub downlink: Option<f64>,
    /// Average time between touch start and touch end, in milliseconds.
    pub touch_latency: f64,
    /// Whether device motion events are available.
    pub supports_device_motion: bool,
    /// Current orientation.
    pub orientation: Orientation,
}

/// User-facing responsiveness measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserExperienceMetrics {
    /// Average input-to-response latency in milliseconds.
    pub input_latency: f64,
    /// Initial load time in milliseconds.
    pub load_time: f64,
    /// Errors reported since start.
    pub error_count: u64,
    /// Percentage of interactions that succeeded, in `[0, 100]`.
    pub interaction_success: f64,
}

impl Default for UserExperienceMetrics {
    fn default() -> Self {
        Self {
            input_latency: 0.0,
            load_time: 0.0,
            error_count: 0,
            interaction_success: 100.0,
        }
    }
}

/// One timestamped bundle of every currently known performance metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Milliseconds on the monitor's clock.
    pub timestamp: u64,
    /// Rendering metrics.
    pub rendering: RenderingMetrics,
    /// Memory metrics.
    pub memory: MemoryMetrics,
    /// Audio metrics.
    pub audio: AudioMetrics,
    /// Mobile metrics, absent on non-mobile devices.
    pub mobile: Option<MobileMetrics>,
    /// User experience metrics.
    pub user_experience: UserExperienceMetrics,
}

impl PerformanceSnapshot {
    /// Creates a snapshot with defaulted sub-records at `timestamp`.
    pub fn empty(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    /// Replaces every sub-record carried by `fragment`, leaving the others untouched.
    pub fn merge(&mut self, fragment: PartialSnapshot) {
        if let Some(rendering) = fragment.rendering {
            self.rendering = rendering;
        }
        if let Some(memory) = fragment.memory {
            self.memory = memory;
        }
        if let Some(audio) = fragment.audio {
            self.audio = audio;
        }
        if let Some(mobile) = fragment.mobile {
            self.mobile = Some(mobile);
        }
        if let Some(user_experience) = fragment.user_experience {
            self.user_experience = user_experience;
        }
    }

    /// Battery level when the device reports one.
    pub fn battery_level(&self) -> Option<f64> {
        self.mobile.as_ref().and_then(|m| m.battery_level)
    }

    /// `true` when the device reports that it is charging.
    pub fn is_charging(&self) -> bool {
        self.mobile.as_ref().is_some_and(|m| m.is_charging)
    }
}

/// The sub-records a single collector contributes for one tick.
///
/// Only the groups a collector owns are `Some`; merging replaces those groups
/// wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSnapshot {
    /// Rendering group.
    pub rendering: Option<RenderingMetrics>,
    /// Memory group.
    pub memory: Option<MemoryMetrics>,
    /// Audio group.
    pub audio: Option<AudioMetrics>,
    /// Mobile group.
    pub mobile: Option<MobileMetrics>,
    /// User experience group.
    pub user_experience: Option<UserExperienceMetrics>,
}

impl PartialSnapshot {
    /// A fragment carrying only rendering metrics.
    pub fn rendering(metrics: RenderingMetrics) -> Self {
        Self {
            rendering: Some(metrics),
            ..Default::default()
        }
    }

    /// A fragment carrying only memory metrics.
    pub fn memory(metrics: MemoryMetrics) -> Self {
        Self {
            memory: Some(metrics),
            ..Default::default()
        }
    }

    /// A fragment carrying only audio metrics.
    pub fn audio(metrics: AudioMetrics) -> Self {
        Self {
            audio: Some(metrics),
            ..Default::default()
        }
    }

    /// A fragment carrying only mobile metrics.
    pub fn mobile(metrics: MobileMetrics) -> Self {
        Self {
            mobile: Some(metrics),
            ..Default::default()
        }
    }

    /// A fragment carrying only user experience metrics.
    pub fn user_experience(metrics: UserExperienceMetrics) -> Self {
        Self {
            user_experience: Some(metrics),
            ..Default::default()
        }
    }

    /// `true` when the fragment carries no group at all.
    pub fn is_empty(&self) -> bool {
        self.rendering.is_none()
            && self.memory.is_none()
            && self.audio.is_none()
            && self.mobile.is_none()
            && self.user_experience.is_none()
    }
}
