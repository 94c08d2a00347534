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

//! The ordered table of quality profiles.

use crate::error::{QualityError, QualityResult};
use pacer_core::QualityProfile;

/// An ordered, non-empty list of uniquely named profiles. A profile's
/// level is its index: level 0 is the lowest fidelity.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityProfileRegistry {
    profiles: Vec<QualityProfile>,
}

impl QualityProfileRegistry {
    /// Creates a registry from profiles ordered lowest fidelity first.
    pub fn new(profiles: Vec<QualityProfile>) -> QualityResult<Self> {
        if profiles.is_empty() {
            return Err(QualityError::InvalidRegistry("no profiles".into()));
        }
        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(QualityError::InvalidRegistry(format!(
                    "duplicate profile '{}'",
                    profile.name
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// The built-in potato → ultra presets.
    pub fn presets() -> Self {
        Self {
            profiles: QualityProfile::presets(),
        }
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always `false`: a registry holds at least one profile.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// The highest valid level.
    pub fn highest_level(&self) -> usize {
        self.profiles.len() - 1
    }

    /// Profile at `level`, if it exists.
    pub fn get(&self, level: usize) -> Option<&QualityProfile> {
        self.profiles.get(level)
    }

    /// Level of the profile called `name`.
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name == name)
    }

    /// Profile called `name`.
    pub fn by_name(&self, name: &str) -> Option<&QualityProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Moves `level` by `delta`, clamped to the valid range.
    pub fn step(&self, level: usize, delta: i32) -> usize {
        let target = level as i64 + i64::from(delta);
        target.clamp(0, self.highest_level() as i64) as usize
    }

    /// All profiles, lowest fidelity first.
    pub fn profiles(&self) -> &[QualityProfile] {
        &self.profiles
    }

    /// Iterates lowest fidelity first.
    pub fn iter(&self) -> impl Iterator<Item = &QualityProfile> {
        self.profiles.iter()
    }
}

impl Default for QualityProfileRegistry {
    fn default() -> Self {
        Self::presets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::EffectComplexity;

    #[test]
    fn presets_are_ordered() {
        let registry = QualityProfileRegistry::presets();
        let names: Vec<&str> = registry.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["potato", "low", "medium", "high", "ultra"]);
        assert_eq!(registry.level_of("high"), Some(3));
        assert_eq!(registry.highest_level(), 4);
    }

    #[test]
    fn step_clamps_to_bounds() {
        let registry = QualityProfileRegistry::presets();
        assert_eq!(registry.step(1, -2), 0);
        assert_eq!(registry.step(3, -2), 1);
        assert_eq!(registry.step(4, 1), 4);
        assert_eq!(registry.step(2, 1), 3);
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(QualityProfileRegistry::new(Vec::new()).is_err());
        let p = QualityProfile::new("same", 1.0, 10, EffectComplexity::Low, 30, 50.0);
        assert!(matches!(
            QualityProfileRegistry::new(vec![p.clone(), p]),
            Err(QualityError::InvalidRegistry(_))
        ));
    }
}
