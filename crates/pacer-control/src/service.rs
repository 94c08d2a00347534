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

//! The adaptive quality controller.

use crate::analysis::{AdaptationDecision, AdaptationPolicy, AdaptationReason};
use crate::config::AdaptiveConfig;
use crate::context::{initial_profile_name, DeviceProfile};
use crate::error::{QualityError, QualityResult};
use crate::metrics::SampleWindow;
use crate::registry::QualityProfileRegistry;
use pacer_core::platform::{
    AudioSink, CapabilitySource, RenderSink, StaticCapabilities, StoreSink, StoreUpdate,
};
use pacer_core::{
    Clock, DeviceCapabilities, DeviceTier, MonotonicClock, PerformanceSnapshot, QualityProfile,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// One applied profile change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptationRecord {
    /// When the change was applied, in clock milliseconds.
    pub timestamp: u64,
    /// Profile that was active before.
    pub previous_profile: String,
    /// Profile now active.
    pub profile: String,
    /// Level of the new profile.
    pub level: usize,
    /// What triggered the change.
    pub reason: AdaptationReason,
}

/// Builder for [`AdaptiveQualityManager`].
pub struct QualityManagerBuilder {
    config: AdaptiveConfig,
    registry: QualityProfileRegistry,
    capabilities: Box<dyn CapabilitySource>,
    clock: Arc<dyn Clock>,
    render: Option<Arc<dyn RenderSink>>,
    audio: Option<Arc<dyn AudioSink>>,
    store: Option<Arc<dyn StoreSink>>,
}

impl QualityManagerBuilder {
    /// Replaces the built-in presets.
    pub fn registry(mut self, registry: QualityProfileRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the capability source read once by [`build`](Self::build).
    pub fn capabilities(mut self, source: impl CapabilitySource + 'static) -> Self {
        self.capabilities = Box::new(source);
        self
    }

    /// Sets the time source used for cooldowns and record timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Connects the renderer.
    pub fn render_sink(mut self, sink: Arc<dyn RenderSink>) -> Self {
        self.render = Some(sink);
        self
    }

    /// Connects the audio output.
    pub fn audio_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.audio = Some(sink);
        self
    }

    /// Connects the application state store.
    pub fn store_sink(mut self, sink: Arc<dyn StoreSink>) -> Self {
        self.store = Some(sink);
        self
    }

    /// Detects the device, picks the starting profile and pushes its settings
    /// to the connected sinks. The starting profile is not an adaptation: it
    /// is not recorded and does not start a cooldown.
    pub fn build(self) -> AdaptiveQualityManager {
        let device = DeviceProfile::detect(self.capabilities.as_ref());
        let level = self
            .registry
            .level_of(initial_profile_name(device.tier))
            .unwrap_or(self.registry.highest_level() / 2);

        let manager = AdaptiveQualityManager {
            policy: AdaptationPolicy::new(self.config.thresholds.clone()),
            config: self.config,
            registry: self.registry,
            device,
            clock: self.clock,
            render: self.render,
            audio: self.audio,
            store: self.store,
            level,
            window: SampleWindow::new(),
            last_adaptation: None,
            history: VecDeque::new(),
        };
        log::info!(
            "AdaptiveQualityManager: Starting with profile '{}'.",
            manager.current_profile().name
        );
        manager.push_settings(manager.current_profile(), level);
        manager
    }
}

/// Closes the loop between measured performance and rendering/audio settings.
///
/// Feed it snapshots through [`process_metrics`](Self::process_metrics), or
/// let [`attach`](crate::attach) subscribe it to a monitor. Automatic changes
/// are rate limited by a cooldown and move at most two levels at a time;
/// [`set_quality_profile`](Self::set_quality_profile) bypasses both.
pub struct AdaptiveQualityManager {
    config: AdaptiveConfig,
    policy: AdaptationPolicy,
    registry: QualityProfileRegistry,
    device: DeviceProfile,
    clock: Arc<dyn Clock>,
    render: Option<Arc<dyn RenderSink>>,
    audio: Option<Arc<dyn AudioSink>>,
    store: Option<Arc<dyn StoreSink>>,
    level: usize,
    window: SampleWindow,
    last_adaptation: Option<u64>,
    history: VecDeque<AdaptationRecord>,
}

impl AdaptiveQualityManager {
    /// Starts building a manager. Without further configuration it uses the
    /// built-in presets, a monotonic clock, default capabilities and no sinks.
    pub fn builder(config: AdaptiveConfig) -> QualityManagerBuilder {
        QualityManagerBuilder {
            config,
            registry: QualityProfileRegistry::presets(),
            capabilities: Box::new(StaticCapabilities::default()),
            clock: Arc::new(MonotonicClock::new()),
            render: None,
            audio: None,
            store: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    /// The detected device, its tier and constraints.
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// The classified device tier.
    pub fn device_tier(&self) -> DeviceTier {
        self.device.tier
    }

    /// The capabilities detected at startup.
    pub fn device_capabilities(&self) -> &DeviceCapabilities {
        &self.device.capabilities
    }

    /// The profile table.
    pub fn registry(&self) -> &QualityProfileRegistry {
        &self.registry
    }

    /// The active profile.
    pub fn current_profile(&self) -> &QualityProfile {
        // `level` is only ever set from registry lookups or clamped steps.
        &self.registry.profiles()[self.level]
    }

    /// Index of the active profile.
    pub fn current_level(&self) -> usize {
        self.level
    }

    /// Whether automatic adaptation is on.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Turns automatic adaptation on or off. Manual overrides keep working and
    /// snapshots keep filling the window while disabled.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            log::info!(
                "AdaptiveQualityManager: Automatic adaptation {}.",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.config.enabled = enabled;
    }

    /// Applied changes, oldest first.
    pub fn adaptation_history(&self) -> impl DoubleEndedIterator<Item = &AdaptationRecord> {
        self.history.iter()
    }

    /// The most recent change.
    pub fn last_adaptation(&self) -> Option<&AdaptationRecord> {
        self.history.back()
    }

    /// Feeds one snapshot and applies a new profile when the policy asks for
    /// one. Returns the applied change.
    pub fn process_metrics(&mut self, snapshot: &PerformanceSnapshot) -> Option<AdaptationRecord> {
        self.window.push(snapshot);
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now_ms();
        if let Some(last) = self.last_adaptation {
            if now.saturating_sub(last) < self.config.cooldown_ms {
                return None;
            }
        }

        let inputs = self.window.inputs()?;
        let (delta, reason) = match self.policy.decide(&inputs, self.current_profile()) {
            AdaptationDecision::Hold => return None,
            AdaptationDecision::Step { delta, reason } => (delta, reason),
        };

        let target = self.registry.step(self.level, delta);
        if target == self.level {
            log::debug!(
                "AdaptiveQualityManager: {} requested but '{}' is already at the limit.",
                reason,
                self.current_profile().name
            );
            return None;
        }
        Some(self.apply(target, reason, now))
    }

    /// Switches to the profile called `name` immediately, regardless of the
    /// cooldown and of whether automatic adaptation is enabled.
    pub fn set_quality_profile(&mut self, name: &str) -> QualityResult<AdaptationRecord> {
        let Some(level) = self.registry.level_of(name) else {
            log::warn!("AdaptiveQualityManager: Unknown quality profile '{name}'.");
            return Err(QualityError::UnknownProfile(name.to_owned()));
        };
        let now = self.clock.now_ms();
        Ok(self.apply(level, AdaptationReason::ManualOverride, now))
    }

    fn apply(&mut self, level: usize, reason: AdaptationReason, now: u64) -> AdaptationRecord {
        let previous = self.current_profile().name.clone();
        self.level = level;
        let profile = self.current_profile().clone();

        log::info!(
            "AdaptiveQualityManager: '{}' -> '{}' ({}).",
            previous,
            profile.name,
            reason
        );
        self.push_settings(&profile, level);

        let record = AdaptationRecord {
            timestamp: now,
            previous_profile: previous,
            profile: profile.name,
            level,
            reason,
        };
        self.history.push_back(record.clone());
        while self.history.len() > self.config.max_adaptation_history {
            self.history.pop_front();
        }
        self.last_adaptation = Some(now);
        self.window.restart();
        record
    }

    /// Pushes `profile` to every connected sink. A failing or panicking sink
    /// is logged and does not stop the others.
    fn push_settings(&self, profile: &QualityProfile, level: usize) {
        if let Some(render) = &self.render {
            let scale = profile.render_scale;
            guarded("render", || {
                render.set_pixel_ratio(render.native_pixel_ratio() * scale)?;
                if let Some((width, height)) = render.display_size() {
                    render.set_size(scaled(width, scale), scaled(height, scale))?;
                }
                Ok(())
            });
        }

        if let Some(audio) = &self.audio {
            let budget = profile
                .audio_latency_ms
                .max(self.device.constraints.min_audio_latency_ms);
            guarded("audio", || audio.set_latency_budget(budget));
        }

        if let Some(store) = &self.store {
            let update = StoreUpdate {
                performance_profile: Some(profile.name.clone()),
                max_particles: Some(profile.max_particles),
                effect_complexity: Some(profile.effect_complexity),
                render_scale: Some(profile.render_scale),
                quality_level: Some(level),
                ..Default::default()
            };
            guarded("store", || store.set_state(update));
        }
    }
}

fn scaled(size: u32, scale: f32) -> u32 {
    (size as f32 * scale).round().max(1.0) as u32
}

fn guarded(sink: &str, apply: impl FnOnce() -> anyhow::Result<()>) {
    match catch_unwind(AssertUnwindSafe(apply)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("AdaptiveQualityManager: {sink} sink rejected settings: {e:#}"),
        Err(_) => {
            log::warn!("AdaptiveQualityManager: {sink} sink panicked while applying settings.")
        }
    }
}

impl std::fmt::Debug for AdaptiveQualityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveQualityManager")
            .field("profile", &self.current_profile().name)
            .field("enabled", &self.config.enabled)
            .field("tier", &self.device.tier)
            .field("last_adaptation", &self.last_adaptation)
            .finish_non_exhaustive()
    }
}
