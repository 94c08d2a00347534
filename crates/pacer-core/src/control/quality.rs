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

//! Quality profiles: named bundles of rendering and audio settings.

use serde::{Deserialize, Serialize};

/// How elaborate post-processing and material effects may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectComplexity {
    /// Effects off.
    Minimal,
    /// Cheap effects only.
    Low,
    /// Default effect set.
    Medium,
    /// Full effect set.
    High,
    /// Everything, including expensive extras.
    Ultra,
}

/// An immutable preset describing one fidelity/performance tradeoff point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Unique name, e.g. `"medium"`.
    pub name: String,
    /// Multiplier applied to the native pixel ratio, in `(0, 2]`.
    pub render_scale: f32,
    /// Maximum number of live particles.
    pub max_particles: u32,
    /// Effect budget.
    pub effect_complexity: EffectComplexity,
    /// Frame rate the profile is expected to sustain.
    pub target_fps: u32,
    /// Audio latency budget in milliseconds.
    pub audio_latency_ms: f64,
}

impl QualityProfile {
    /// Creates a profile.
    pub fn new(
        name: impl Into<String>,
        render_scale: f32,
        max_particles: u32,
        effect_complexity: EffectComplexity,
        target_fps: u32,
        audio_latency_ms: f64,
    ) -> Self {
        Self {
            name: name.into(),
            render_scale,
            max_particles,
            effect_complexity,
            target_fps,
            audio_latency_ms,
        }
    }

    /// The built-in presets, lowest fidelity first.
    pub fn presets() -> Vec<QualityProfile> {
        vec![
            QualityProfile::new("potato", 0.5, 100, EffectComplexity::Minimal, 30, 100.0),
            QualityProfile::new("low", 0.75, 250, EffectComplexity::Low, 30, 80.0),
            QualityProfile::new("medium", 1.0, 500, EffectComplexity::Medium, 60, 50.0),
            QualityProfile::new("high", 1.0, 1000, EffectComplexity::High, 60, 30.0),
            QualityProfile::new("ultra", 1.25, 2000, EffectComplexity::Ultra, 60, 20.0),
        ]
    }
}
