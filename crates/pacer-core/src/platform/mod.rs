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

//! Provides abstractions over the host platform.
//!
//! This module describes what the runtime environment can do (capabilities,
//! tier, constraints) and defines the narrow interfaces through which the
//! monitor and the quality manager talk to external collaborators: renderers,
//! audio contexts, state stores and device sensors.

pub mod sink;

pub use sink::{
    AudioContextSource, AudioSink, BatteryStatus, DeviceSensors, HeapStats, MemoryIntrospector,
    NetworkInfo, RenderSink, RenderStatsSource, RendererCounters, StoreSink, StoreUpdate,
};

use serde::{Deserialize, Serialize};

/// Graphics API generations, ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsApi {
    /// No hardware-accelerated graphics.
    #[default]
    Unavailable,
    /// WebGL 1 / GLES 2 class.
    WebGl,
    /// WebGL 2 / GLES 3 class.
    WebGl2,
    /// WebGPU / modern explicit API class.
    WebGpu,
}

/// What the runtime environment supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Best available graphics API.
    pub graphics_api: GraphicsApi,
    /// Whether background workers/threads can be spawned.
    pub supports_workers: bool,
    /// Whether heap usage can be read from the host.
    pub supports_memory_introspection: bool,
    /// Logical CPU cores.
    pub cpu_cores: u32,
    /// Device memory in GiB, when exposed.
    pub device_memory_gb: Option<f64>,
    /// Whether the device was classified as mobile.
    pub is_mobile: bool,
    /// Largest supported texture dimension, when known.
    pub max_texture_size: Option<u32>,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            graphics_api: GraphicsApi::WebGl2,
            supports_workers: true,
            supports_memory_introspection: false,
            cpu_cores: 4,
            device_memory_gb: None,
            is_mobile: false,
            max_texture_size: None,
        }
    }
}

/// Coarse classification of the runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTier {
    /// Constrained hardware.
    Low,
    /// Typical hardware.
    Mid,
    /// Top-tier hardware.
    High,
}

/// Numeric ceilings derived from capabilities and tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConstraints {
    /// Largest texture dimension the application should allocate.
    pub max_texture_size: u32,
    /// Lowest audio latency worth requesting, in milliseconds.
    pub min_audio_latency_ms: f64,
    /// Memory the application should stay under, in MiB.
    pub max_memory_mb: u64,
}

/// Detects the capabilities of the host once at startup.
pub trait CapabilitySource: Send + Sync {
    /// Reads the host capabilities.
    fn detect(&self) -> DeviceCapabilities;
}

/// A source returning a fixed capability set, for hosts that know their own
/// environment up front and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities(pub DeviceCapabilities);

impl CapabilitySource for StaticCapabilities {
    fn detect(&self) -> DeviceCapabilities {
        self.0.clone()
    }
}
