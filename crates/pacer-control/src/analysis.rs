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

//! The adaptation policy.
//!
//! The [`AdaptationPolicy`] turns the windowed inputs and the active profile
//! into a signed level change. Conditions are checked in strict priority
//! order and the first match wins.

use crate::config::AdaptationThresholds;
use crate::metrics::PolicyInputs;
use pacer_core::QualityProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a profile change happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationReason {
    /// Average FPS collapsed.
    CriticalFpsDrop,
    /// Memory is nearly exhausted.
    CriticalMemoryPressure,
    /// Battery is nearly empty and not charging.
    CriticalBattery,
    /// Average FPS is well below the profile's target.
    LowFps,
    /// Memory pressure is high.
    HighMemoryPressure,
    /// Audio keeps running dry.
    AudioUnderruns,
    /// Battery is low and not charging.
    BatterySaving,
    /// Every signal has room to spare.
    PerformanceHeadroom,
    /// A caller picked the profile explicitly.
    ManualOverride,
}

impl fmt::Display for AdaptationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CriticalFpsDrop => "critical_fps_drop",
            Self::CriticalMemoryPressure => "critical_memory_pressure",
            Self::CriticalBattery => "critical_battery",
            Self::LowFps => "low_fps",
            Self::HighMemoryPressure => "high_memory_pressure",
            Self::AudioUnderruns => "audio_underruns",
            Self::BatterySaving => "battery_saving",
            Self::PerformanceHeadroom => "performance_headroom",
            Self::ManualOverride => "manual_override",
        };
        f.write_str(s)
    }
}

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptationDecision {
    /// Keep the current profile.
    Hold,
    /// Move by `delta` levels; negative values lower quality.
    Step {
        /// Signed level change, in `-2..=1`.
        delta: i32,
        /// What triggered it.
        reason: AdaptationReason,
    },
}

impl AdaptationDecision {
    fn step(delta: i32, reason: AdaptationReason) -> Self {
        AdaptationDecision::Step { delta, reason }
    }
}

/// Priority-ordered decision rules over [`PolicyInputs`].
#[derive(Debug, Clone, Default)]
pub struct AdaptationPolicy {
    thresholds: AdaptationThresholds,
}

impl AdaptationPolicy {
    /// Creates a policy with the given thresholds.
    pub fn new(thresholds: AdaptationThresholds) -> Self {
        Self { thresholds }
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &AdaptationThresholds {
        &self.thresholds
    }

    /// Decides how to move away from `profile`.
    ///
    /// 1. **Critical**: two levels down.
    /// 2. **Degraded**: one level down.
    /// 3. **Battery saving**: one level down.
    /// 4. **Headroom**: one level up, only when every signal agrees.
    ///
    /// Without a measured frame rate the FPS conditions are skipped and
    /// headroom is never reported.
    pub fn decide(&self, inputs: &PolicyInputs, profile: &QualityProfile) -> AdaptationDecision {
        let t = &self.thresholds;
        let target_fps = f64::from(profile.target_fps);
        let fps_below = |limit: f64| inputs.average_fps.filter(|fps| *fps < limit);
        let draining = |below: f64| {
            !inputs.is_charging && inputs.battery_level.is_some_and(|level| level < below)
        };

        // ── 1. Critical ──────────────────────────────────────────────────
        if let Some(fps) = fps_below(t.critical_fps) {
            log::warn!("AdaptationPolicy: Critical FPS drop ({:.1} avg).", fps);
            return AdaptationDecision::step(-2, AdaptationReason::CriticalFpsDrop);
        }
        if inputs.memory_pressure > t.critical_memory_pressure {
            log::warn!(
                "AdaptationPolicy: Critical memory pressure ({:.0}%).",
                inputs.memory_pressure * 100.0
            );
            return AdaptationDecision::step(-2, AdaptationReason::CriticalMemoryPressure);
        }
        if draining(t.critical_battery) {
            log::warn!("AdaptationPolicy: Battery critical and not charging.");
            return AdaptationDecision::step(-2, AdaptationReason::CriticalBattery);
        }

        // ── 2. Degraded ──────────────────────────────────────────────────
        if let Some(fps) = fps_below(target_fps * t.degraded_fps_ratio) {
            log::debug!(
                "AdaptationPolicy: {:.1} FPS against a target of {}.",
                fps,
                profile.target_fps
            );
            return AdaptationDecision::step(-1, AdaptationReason::LowFps);
        }
        if inputs.memory_pressure > t.degraded_memory_pressure {
            return AdaptationDecision::step(-1, AdaptationReason::HighMemoryPressure);
        }
        if inputs.audio_underruns > t.max_audio_underruns {
            return AdaptationDecision::step(-1, AdaptationReason::AudioUnderruns);
        }

        // ── 3. Battery Saving ────────────────────────────────────────────
        if draining(t.battery_saving) {
            return AdaptationDecision::step(-1, AdaptationReason::BatterySaving);
        }

        // ── 4. Headroom ──────────────────────────────────────────────────
        let headroom = inputs
            .average_fps
            .is_some_and(|fps| fps > target_fps * t.headroom_fps_ratio)
            && inputs.memory_pressure < t.headroom_memory_pressure
            && inputs.audio_latency_ms < profile.audio_latency_ms * t.headroom_latency_ratio
            && inputs
                .battery_level
                .map_or(true, |level| level > t.headroom_battery);
        if headroom {
            return AdaptationDecision::step(1, AdaptationReason::PerformanceHeadroom);
        }

        AdaptationDecision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::EffectComplexity;

    fn high() -> QualityProfile {
        QualityProfile::new("high", 1.0, 1000, EffectComplexity::High, 60, 30.0)
    }

    fn healthy() -> PolicyInputs {
        PolicyInputs {
            average_fps: Some(60.0),
            memory_pressure: 0.4,
            audio_underruns: 0,
            audio_latency_ms: 12.0,
            battery_level: None,
            is_charging: false,
        }
    }

    fn reason(decision: AdaptationDecision) -> Option<(i32, AdaptationReason)> {
        match decision {
            AdaptationDecision::Hold => None,
            AdaptationDecision::Step { delta, reason } => Some((delta, reason)),
        }
    }

    #[test]
    fn test_on_target_holds() {
        let policy = AdaptationPolicy::default();
        assert_eq!(policy.decide(&healthy(), &high()), AdaptationDecision::Hold);
    }

    #[test]
    fn test_critical_beats_everything() {
        let policy = AdaptationPolicy::default();
        let inputs = PolicyInputs {
            average_fps: Some(15.0),
            memory_pressure: 0.95,
            audio_underruns: 20,
            battery_level: Some(0.05),
            ..healthy()
        };
        assert_eq!(
            reason(policy.decide(&inputs, &high())),
            Some((-2, AdaptationReason::CriticalFpsDrop))
        );

        let inputs = PolicyInputs {
            memory_pressure: 0.95,
            ..healthy()
        };
        assert_eq!(
            reason(policy.decide(&inputs, &high())),
            Some((-2, AdaptationReason::CriticalMemoryPressure))
        );
    }

    #[test]
    fn test_degraded_steps_once() {
        let policy = AdaptationPolicy::default();
        let cases = [
            (
                PolicyInputs {
                    average_fps: Some(40.0),
                    ..healthy()
                },
                AdaptationReason::LowFps,
            ),
            (
                PolicyInputs {
                    memory_pressure: 0.88,
                    ..healthy()
                },
                AdaptationReason::HighMemoryPressure,
            ),
            (
                PolicyInputs {
                    audio_underruns: 6,
                    ..healthy()
                },
                AdaptationReason::AudioUnderruns,
            ),
        ];
        for (inputs, expected) in cases {
            assert_eq!(
                reason(policy.decide(&inputs, &high())),
                Some((-1, expected))
            );
        }
    }

    #[test]
    fn test_battery_rules_ignore_charging_devices() {
        let policy = AdaptationPolicy::default();
        let low = PolicyInputs {
            battery_level: Some(0.15),
            ..healthy()
        };
        assert_eq!(
            reason(policy.decide(&low, &high())),
            Some((-1, AdaptationReason::BatterySaving))
        );

        let empty = PolicyInputs {
            battery_level: Some(0.05),
            ..healthy()
        };
        assert_eq!(
            reason(policy.decide(&empty, &high())),
            Some((-2, AdaptationReason::CriticalBattery))
        );

        let charging = PolicyInputs {
            is_charging: true,
            ..empty
        };
        assert_eq!(policy.decide(&charging, &high()), AdaptationDecision::Hold);
    }

    #[test]
    fn test_headroom_needs_every_signal() {
        let policy = AdaptationPolicy::default();
        let fast = PolicyInputs {
            average_fps: Some(70.0),
            ..healthy()
        };
        assert_eq!(
            reason(policy.decide(&fast, &high())),
            Some((1, AdaptationReason::PerformanceHeadroom))
        );

        let slow_audio = PolicyInputs {
            audio_latency_ms: 28.0,
            ..fast.clone()
        };
        assert_eq!(policy.decide(&slow_audio, &high()), AdaptationDecision::Hold);

        let half_battery = PolicyInputs {
            battery_level: Some(0.45),
            ..fast.clone()
        };
        assert_eq!(policy.decide(&half_battery, &high()), AdaptationDecision::Hold);

        let busy_memory = PolicyInputs {
            memory_pressure: 0.7,
            ..fast
        };
        assert_eq!(policy.decide(&busy_memory, &high()), AdaptationDecision::Hold);
    }

    #[test]
    fn test_unknown_fps_is_not_a_drop() {
        let policy = AdaptationPolicy::default();
        let unmeasured = PolicyInputs {
            average_fps: None,
            ..healthy()
        };
        assert_eq!(policy.decide(&unmeasured, &high()), AdaptationDecision::Hold);

        // Other signals still count.
        let full = PolicyInputs {
            memory_pressure: 0.95,
            ..unmeasured
        };
        assert_eq!(
            reason(policy.decide(&full, &high())),
            Some((-2, AdaptationReason::CriticalMemoryPressure))
        );
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(
            AdaptationReason::CriticalFpsDrop.to_string(),
            "critical_fps_drop"
        );
        assert_eq!(
            serde_json::to_string(&AdaptationReason::CriticalMemoryPressure).unwrap(),
            "\"critical_memory_pressure\""
        );
    }
}
