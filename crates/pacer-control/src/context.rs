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

//! Device context for quality decisions.
//!
//! Capabilities are detected once at startup, classified into a [`DeviceTier`]
//! and turned into [`DeviceConstraints`]. The tier also picks the profile the
//! controller starts from.

use pacer_core::platform::{CapabilitySource, GraphicsApi};
use pacer_core::{DeviceCapabilities, DeviceConstraints, DeviceTier};
use serde::Serialize;

/// Memory (GiB) a high tier device must report.
const HIGH_TIER_MEMORY_GB: f64 = 8.0;
/// Cores a high tier device must report.
const HIGH_TIER_CORES: u32 = 8;
/// Memory (GiB) at or below which a mobile device is low tier.
const LOW_TIER_MEMORY_GB: f64 = 2.0;
/// Cores at or below which a mobile device is low tier.
const LOW_TIER_CORES: u32 = 2;

/// Classifies capabilities into a tier.
///
/// | Tier | Condition |
/// |---|---|
/// | High | WebGPU class API, at least 8 GiB and 8 cores |
/// | Low | Mobile with at most 2 GiB or at most 2 cores |
/// | Mid | Everything else |
///
/// Unknown device memory never qualifies as high tier.
pub fn classify_tier(capabilities: &DeviceCapabilities) -> DeviceTier {
    let memory = capabilities.device_memory_gb;

    let high = capabilities.graphics_api == GraphicsApi::WebGpu
        && memory.is_some_and(|gb| gb >= HIGH_TIER_MEMORY_GB)
        && capabilities.cpu_cores >= HIGH_TIER_CORES;
    if high {
        return DeviceTier::High;
    }

    let constrained = memory.is_some_and(|gb| gb <= LOW_TIER_MEMORY_GB)
        || capabilities.cpu_cores <= LOW_TIER_CORES;
    if capabilities.is_mobile && constrained {
        return DeviceTier::Low;
    }

    DeviceTier::Mid
}

/// Derives numeric ceilings for a tier, tightened further by what the
/// hardware reports.
pub fn derive_constraints(
    capabilities: &DeviceCapabilities,
    tier: DeviceTier,
) -> DeviceConstraints {
    let (texture, min_latency, memory_mb) = match tier {
        DeviceTier::Low => (2048, 40.0, 512),
        DeviceTier::Mid => (4096, 20.0, 1024),
        DeviceTier::High => (8192, 10.0, 2048),
    };

    let max_texture_size = capabilities
        .max_texture_size
        .map_or(texture, |reported| reported.min(texture));

    // Never budget more than half of the physical memory.
    let max_memory_mb = capabilities
        .device_memory_gb
        .map_or(memory_mb, |gb| memory_mb.min((gb * 1024.0 / 2.0) as u64));

    DeviceConstraints {
        max_texture_size,
        min_audio_latency_ms: min_latency,
        max_memory_mb,
    }
}

/// Name of the profile a device of `tier` starts with.
pub fn initial_profile_name(tier: DeviceTier) -> &'static str {
    match tier {
        DeviceTier::Low => "low",
        DeviceTier::Mid => "medium",
        DeviceTier::High => "high",
    }
}

/// Everything known about the device, fixed for the lifetime of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProfile {
    /// Detected capabilities.
    pub capabilities: DeviceCapabilities,
    /// Classified tier.
    pub tier: DeviceTier,
    /// Derived ceilings.
    pub constraints: DeviceConstraints,
}

impl DeviceProfile {
    /// Builds the profile from already detected capabilities.
    pub fn from_capabilities(capabilities: DeviceCapabilities) -> Self {
        let tier = classify_tier(&capabilities);
        let constraints = derive_constraints(&capabilities, tier);
        Self {
            capabilities,
            tier,
            constraints,
        }
    }

    /// Detects the host and builds the profile.
    pub fn detect(source: &dyn CapabilitySource) -> Self {
        let profile = Self::from_capabilities(source.detect());
        log::info!(
            "DeviceProfile: {:?} tier ({:?}, {} cores, {:?} GiB, mobile: {}).",
            profile.tier,
            profile.capabilities.graphics_api,
            profile.capabilities.cpu_cores,
            profile.capabilities.device_memory_gb,
            profile.capabilities.is_mobile
        );
        profile
    }
}
