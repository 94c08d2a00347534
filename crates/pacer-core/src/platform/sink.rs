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

//! Capability interfaces for external collaborators.
//!
//! Collectors read from sources (audio context, renderer counters, heap
//! introspection, device sensors); the monitor and the quality manager write
//! to sinks (renderer, audio output, state store). Every method that a host
//! might not support has a default, and every reference to a collaborator is
//! held as an `Option`, so absence is a normal input rather than an error.

use crate::control::quality::EffectComplexity;
use crate::telemetry::alert::PerformanceAlert;
use crate::telemetry::snapshot::{AudioContextState, NetworkType, Orientation, PerformanceSnapshot};
use async_trait::async_trait;
use serde::Serialize;

/// Receives resolution settings from the quality manager.
pub trait RenderSink: Send + Sync {
    /// Sets the ratio between drawing-buffer pixels and display pixels.
    fn set_pixel_ratio(&self, _ratio: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Resizes the drawing buffer.
    fn set_size(&self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Current display size in logical pixels, used to compute the target size.
    fn display_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Native device pixel ratio.
    fn native_pixel_ratio(&self) -> f32 {
        1.0
    }
}

/// Receives the audio latency budget from the quality manager.
pub trait AudioSink: Send + Sync {
    /// Requests an output latency, in milliseconds.
    fn set_latency_budget(&self, _latency_ms: f64) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The partial state pushed to a [`StoreSink`].
///
/// Only the keys that are `Some` are meant to be written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    /// Latest snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceSnapshot>,
    /// Unresolved alerts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_alerts: Option<Vec<PerformanceAlert>>,
    /// Raised when an unacknowledged critical alert is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_performance_dashboard: Option<bool>,
    /// Active quality profile name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_profile: Option<String>,
    /// Particle budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_particles: Option<u32>,
    /// Effect budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_complexity: Option<EffectComplexity>,
    /// Render scale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_scale: Option<f32>,
    /// Active quality level (registry index).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_level: Option<usize>,
}

/// Any application state container that accepts partial updates.
pub trait StoreSink: Send + Sync {
    /// Merges `update` into the store.
    fn set_state(&self, update: StoreUpdate) -> anyhow::Result<()>;
}

/// A read-only view of an audio context.
pub trait AudioContextSource: Send + Sync {
    /// Current lifecycle state.
    fn state(&self) -> AudioContextState;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Processing latency reported by the context, in milliseconds.
    fn base_latency_ms(&self) -> Option<f64> {
        None
    }

    /// Output device latency reported by the context, in milliseconds.
    fn output_latency_ms(&self) -> Option<f64> {
        None
    }

    /// Buffer size in frames, when the context exposes it.
    fn buffer_size(&self) -> Option<u32> {
        None
    }
}

/// Per-frame counters a renderer can report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RendererCounters {
    /// Draw calls issued in the last frame.
    pub draw_calls: u64,
    /// Triangles submitted in the last frame.
    pub triangles: u64,
    /// GPU time in milliseconds, when timestamp queries are available.
    pub gpu_time_ms: Option<f64>,
}

/// A renderer that exposes frame counters.
pub trait RenderStatsSource: Send + Sync {
    /// Counters for the most recent frame.
    fn counters(&self) -> RendererCounters;
}

/// Heap numbers read from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes in use.
    pub used: u64,
    /// Bytes reserved.
    pub total: u64,
    /// Upper bound.
    pub limit: u64,
}

/// Host memory introspection.
pub trait MemoryIntrospector: Send + Sync {
    /// Reads the current heap numbers, `None` when the host cannot report them.
    fn heap_stats(&self) -> Option<HeapStats>;
}

/// Battery state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    /// Charge in `[0.0, 1.0]`.
    pub level: f64,
    /// `true` while connected to power.
    pub charging: bool,
}

/// Connection information reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkInfo {
    /// Effective connection type.
    pub effective_type: NetworkType,
    /// Estimated downlink in Mbit/s.
    pub downlink: Option<f64>,
}

/// Device-specific sensors used by the mobile collector.
///
/// Battery queries may be slow on some platforms; callers apply a timeout.
#[async_trait]
pub trait DeviceSensors: Send + Sync {
    /// Battery state, `None` when the platform hides it.
    async fn battery(&self) -> Option<BatteryStatus> {
        None
    }

    /// Network state, `None` when not exposed.
    fn network(&self) -> Option<NetworkInfo> {
        None
    }

    /// Whether device motion events are available.
    fn supports_device_motion(&self) -> bool {
        false
    }

    /// Current screen orientation.
    fn orientation(&self) -> Orientation {
        Orientation::Portrait
    }
}
