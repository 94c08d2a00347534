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

//! Configuration of the adaptive quality controller.
//!
//! The decision mechanism (priority order, step sizes, cooldown) is fixed;
//! every numeric trigger is a tunable default.

use crate::error::QualityResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric triggers of the adaptation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationThresholds {
    /// Average FPS below which the drop is critical.
    pub critical_fps: f64,
    /// Memory pressure above which the situation is critical.
    pub critical_memory_pressure: f64,
    /// Battery level below which, when not charging, the situation is critical.
    pub critical_battery: f64,
    /// Fraction of the profile's target FPS below which performance is degraded.
    pub degraded_fps_ratio: f64,
    /// Memory pressure above which performance is degraded.
    pub degraded_memory_pressure: f64,
    /// Underruns since the last adaptation above which audio is degraded.
    pub max_audio_underruns: u64,
    /// Battery level below which, when not charging, quality is reduced.
    pub battery_saving: f64,
    /// Fraction of the profile's target FPS above which there is headroom.
    pub headroom_fps_ratio: f64,
    /// Memory pressure under which there is headroom.
    pub headroom_memory_pressure: f64,
    /// Fraction of the profile's audio budget under which latency has headroom.
    pub headroom_latency_ratio: f64,
    /// Battery level above which there is headroom. Devices without a battery
    /// always qualify.
    pub headroom_battery: f64,
}

impl Default for AdaptationThresholds {
    fn default() -> Self {
        Self {
            critical_fps: 20.0,
            critical_memory_pressure: 0.9,
            critical_battery: 0.1,
            degraded_fps_ratio: 0.8,
            degraded_memory_pressure: 0.85,
            max_audio_underruns: 5,
            battery_saving: 0.2,
            headroom_fps_ratio: 1.1,
            headroom_memory_pressure: 0.6,
            headroom_latency_ratio: 0.8,
            headroom_battery: 0.5,
        }
    }
}

/// Adaptive quality controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Minimum time between two automatic adaptations, in milliseconds.
    pub cooldown_ms: u64,
    /// Whether automatic adaptation runs at all.
    pub enabled: bool,
    /// Adaptation records kept, oldest dropped first.
    pub max_adaptation_history: usize,
    /// Policy triggers.
    pub thresholds: AdaptationThresholds,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 5_000,
            enabled: true,
            max_adaptation_history: 50,
            thresholds: AdaptationThresholds::default(),
        }
    }
}

impl AdaptiveConfig {
    /// Loads a configuration from a JSON string.
    pub fn from_json(json: &str) -> QualityResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> QualityResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Writes the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> QualityResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_thresholds_accept_partial_documents() {
        let json = r#"{ "cooldown_ms": 1000, "thresholds": { "critical_fps": 12 } }"#;
        let config = AdaptiveConfig::from_json(json).unwrap();
        assert_eq!(config.cooldown_ms, 1_000);
        assert_eq!(config.thresholds.critical_fps, 12.0);
        assert_eq!(config.thresholds.degraded_memory_pressure, 0.85);
        assert!(config.enabled);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adaptive.json");
        let config = AdaptiveConfig {
            enabled: false,
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(AdaptiveConfig::from_file(&path).unwrap(), config);
    }
}
