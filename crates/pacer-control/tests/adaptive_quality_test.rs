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

use async_trait::async_trait;
use pacer_control::{
    attach, AdaptationReason, AdaptiveConfig, AdaptiveQualityManager, QualityError,
};
use pacer_core::platform::{
    AudioSink, GraphicsApi, RenderSink, StaticCapabilities, StoreSink, StoreUpdate,
};
use pacer_core::telemetry::{CollectorResult, MetricCollector, PartialSnapshot, RenderingMetrics};
use pacer_core::utils::clock::ManualClock;
use pacer_core::{DeviceCapabilities, DeviceTier, PerformanceSnapshot};
use pacer_infra::RenderingCollector;
use pacer_telemetry::{MonitorConfig, PerformanceMonitor};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingRenderer {
    ratios: Mutex<Vec<f32>>,
    sizes: Mutex<Vec<(u32, u32)>>,
}

impl RenderSink for RecordingRenderer {
    fn set_pixel_ratio(&self, ratio: f32) -> anyhow::Result<()> {
        self.ratios.lock().unwrap().push(ratio);
        Ok(())
    }

    fn set_size(&self, width: u32, height: u32) -> anyhow::Result<()> {
        self.sizes.lock().unwrap().push((width, height));
        Ok(())
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        Some((800, 600))
    }

    fn native_pixel_ratio(&self) -> f32 {
        2.0
    }
}

#[derive(Default)]
struct RecordingAudio(Mutex<Vec<f64>>);

impl AudioSink for RecordingAudio {
    fn set_latency_budget(&self, latency_ms: f64) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(latency_ms);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingStore(Mutex<Vec<StoreUpdate>>);

impl StoreSink for RecordingStore {
    fn set_state(&self, update: StoreUpdate) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(update);
        Ok(())
    }
}

struct FailingRenderer;

impl RenderSink for FailingRenderer {
    fn set_pixel_ratio(&self, _ratio: f32) -> anyhow::Result<()> {
        anyhow::bail!("context lost")
    }
}

struct PanickingAudio;

impl AudioSink for PanickingAudio {
    fn set_latency_budget(&self, _latency_ms: f64) -> anyhow::Result<()> {
        panic!("audio device gone")
    }
}

fn high_end() -> StaticCapabilities {
    StaticCapabilities(DeviceCapabilities {
        graphics_api: GraphicsApi::WebGpu,
        cpu_cores: 12,
        device_memory_gb: Some(16.0),
        ..Default::default()
    })
}

fn low_end_phone() -> StaticCapabilities {
    StaticCapabilities(DeviceCapabilities {
        graphics_api: GraphicsApi::WebGl,
        cpu_cores: 2,
        device_memory_gb: Some(2.0),
        is_mobile: true,
        ..Default::default()
    })
}

fn snapshot(fps: f64, pressure: f64) -> PerformanceSnapshot {
    let mut snapshot = PerformanceSnapshot::empty(0);
    snapshot.rendering.fps = fps;
    snapshot.rendering.frame_times = vec![1000.0 / fps];
    snapshot.memory.heap_used = (pressure * 1000.0).round() as u64;
    snapshot.memory.heap_limit = 1000;
    snapshot.audio.latency = 10.0;
    snapshot
}

fn manager_on(
    capabilities: StaticCapabilities,
    config: AdaptiveConfig,
) -> (AdaptiveQualityManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let manager = AdaptiveQualityManager::builder(config)
        .capabilities(capabilities)
        .clock(clock.clone())
        .build();
    (manager, clock)
}

#[test]
fn high_tier_device_holds_when_on_target() {
    let (mut manager, clock) = manager_on(high_end(), AdaptiveConfig::default());
    assert_eq!(manager.device_tier(), DeviceTier::High);
    assert_eq!(manager.device_capabilities().cpu_cores, 12);
    assert_eq!(manager.current_profile().name, "high");

    let mut sample = snapshot(60.0, 0.2);
    sample.audio.latency = 20.0;
    for _ in 0..10 {
        assert!(manager.process_metrics(&sample).is_none());
        clock.advance_ms(1_000);
    }

    assert_eq!(manager.current_profile().name, "high");
    assert_eq!(manager.adaptation_history().count(), 0);
}

#[test]
fn critical_drop_lowers_two_levels_once_per_cooldown() {
    let (mut manager, clock) = manager_on(high_end(), AdaptiveConfig::default());

    let mut applied = Vec::new();
    for _ in 0..10 {
        applied.extend(manager.process_metrics(&snapshot(15.0, 0.95)));
        clock.advance_ms(100);
    }

    assert_eq!(applied.len(), 1);
    let record = &applied[0];
    assert_eq!(record.previous_profile, "high");
    assert_eq!(record.profile, "low");
    assert_eq!(record.level, 1);
    assert_eq!(record.reason, AdaptationReason::CriticalFpsDrop);
    assert_eq!(manager.last_adaptation(), Some(record));
}

#[test]
fn critical_steps_clamp_at_lowest_profile() {
    let (mut manager, clock) = manager_on(high_end(), AdaptiveConfig::default());

    manager.process_metrics(&snapshot(10.0, 0.5)).unwrap();
    clock.advance_ms(5_000);
    let record = manager.process_metrics(&snapshot(10.0, 0.5)).unwrap();
    assert_eq!(record.profile, "potato");

    clock.advance_ms(5_000);
    assert!(manager.process_metrics(&snapshot(10.0, 0.5)).is_none());
    assert_eq!(manager.current_level(), 0);
}

#[test]
fn cooldown_separates_automatic_changes() {
    let (mut manager, clock) = manager_on(StaticCapabilities::default(), AdaptiveConfig::default());
    assert_eq!(manager.current_profile().name, "medium");

    assert!(manager.process_metrics(&snapshot(40.0, 0.5)).is_some());
    clock.advance_ms(4_999);
    assert!(manager.process_metrics(&snapshot(10.0, 0.5)).is_none());
    clock.advance_ms(1);
    assert!(manager.process_metrics(&snapshot(10.0, 0.5)).is_some());
}

#[test]
fn level_changes_are_bounded_and_spaced() {
    let (mut manager, clock) = manager_on(high_end(), AdaptiveConfig::default());
    let mut previous_level = manager.current_level();
    let mut previous_time: Option<u64> = None;

    for second in 0..90u64 {
        let sample = match second {
            0..=29 => snapshot(10.0, 0.5),
            30..=59 => snapshot(90.0, 0.2),
            _ => snapshot(40.0, 0.88),
        };
        if let Some(record) = manager.process_metrics(&sample) {
            let step = record.level as i64 - previous_level as i64;
            assert!((-2..=1).contains(&step), "step {step} at {second}s");
            if let Some(t) = previous_time {
                assert!(record.timestamp - t >= 5_000);
            }
            previous_level = record.level;
            previous_time = Some(record.timestamp);
        }
        assert!(manager.current_level() < manager.registry().len());
        clock.advance_ms(1_000);
    }
    assert!(manager.adaptation_history().count() >= 3);
}

#[test]
fn headroom_raises_one_level() {
    let (mut manager, _clock) =
        manager_on(StaticCapabilities::default(), AdaptiveConfig::default());

    let record = manager.process_metrics(&snapshot(75.0, 0.3)).unwrap();
    assert_eq!(record.previous_profile, "medium");
    assert_eq!(record.profile, "high");
    assert_eq!(record.reason, AdaptationReason::PerformanceHeadroom);
}

#[test]
fn manual_override_is_immediate_and_idempotent() {
    let renderer = Arc::new(RecordingRenderer::default());
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(ManualClock::new(0));
    let mut manager = AdaptiveQualityManager::builder(AdaptiveConfig::default())
        .clock(clock.clone())
        .render_sink(renderer.clone())
        .store_sink(store.clone())
        .build();

    let first = manager.set_quality_profile("low").unwrap();
    assert_eq!(first.reason, AdaptationReason::ManualOverride);
    assert_eq!(manager.current_profile().name, "low");
    assert_eq!(*renderer.sizes.lock().unwrap().last().unwrap(), (600, 450));

    manager.set_quality_profile("high").unwrap();
    manager.set_quality_profile("high").unwrap();
    assert_eq!(manager.current_profile().name, "high");

    let ratios = renderer.ratios.lock().unwrap();
    assert_eq!(ratios[ratios.len() - 1], 2.0);
    assert_eq!(ratios[ratios.len() - 1], ratios[ratios.len() - 2]);

    let updates = store.0.lock().unwrap();
    let last = &updates[updates.len() - 1];
    assert_eq!(last, &updates[updates.len() - 2]);
    assert_eq!(last.performance_profile.as_deref(), Some("high"));
    assert_eq!(last.max_particles, Some(1000));
    assert_eq!(last.quality_level, Some(3));
    assert_eq!(manager.adaptation_history().count(), 3);

    // The override restarted the cooldown.
    clock.advance_ms(1_000);
    assert!(manager.process_metrics(&snapshot(10.0, 0.5)).is_none());
}

#[test]
fn unknown_profile_changes_nothing() {
    let (mut manager, _clock) =
        manager_on(StaticCapabilities::default(), AdaptiveConfig::default());

    let err = manager.set_quality_profile("cinematic").unwrap_err();
    assert!(matches!(err, QualityError::UnknownProfile(ref name) if name == "cinematic"));
    assert_eq!(manager.current_profile().name, "medium");
    assert!(manager.last_adaptation().is_none());
}

#[test]
fn failing_sinks_do_not_block_the_others() {
    let store = Arc::new(RecordingStore::default());
    let mut manager = AdaptiveQualityManager::builder(AdaptiveConfig::default())
        .render_sink(Arc::new(FailingRenderer))
        .audio_sink(Arc::new(PanickingAudio))
        .store_sink(store.clone())
        .build();

    let record = manager.set_quality_profile("potato").unwrap();
    assert_eq!(record.profile, "potato");
    assert_eq!(manager.current_profile().name, "potato");

    let updates = store.0.lock().unwrap();
    assert_eq!(updates.len(), 2, "initial profile plus the override");
    assert_eq!(updates[1].performance_profile.as_deref(), Some("potato"));
}

#[test]
fn disabled_manager_only_accepts_manual_changes() {
    let (mut manager, clock) = manager_on(StaticCapabilities::default(), AdaptiveConfig::default());
    manager.set_enabled(false);

    for _ in 0..10 {
        assert!(manager.process_metrics(&snapshot(5.0, 0.99)).is_none());
        clock.advance_ms(1_000);
    }
    assert_eq!(manager.current_profile().name, "medium");

    manager.set_quality_profile("ultra").unwrap();
    assert_eq!(manager.current_profile().name, "ultra");

    manager.set_enabled(true);
    clock.advance_ms(5_000);
    let record = manager.process_metrics(&snapshot(5.0, 0.99)).unwrap();
    assert_eq!(record.previous_profile, "ultra");
    assert_eq!(record.profile, "high");
}

#[test]
fn low_tier_device_starts_low_with_latency_floor() {
    let audio = Arc::new(RecordingAudio::default());
    let mut manager = AdaptiveQualityManager::builder(AdaptiveConfig::default())
        .capabilities(low_end_phone())
        .audio_sink(audio.clone())
        .build();

    assert_eq!(manager.device().tier, DeviceTier::Low);
    assert_eq!(manager.current_profile().name, "low");
    assert_eq!(manager.device().constraints.max_texture_size, 2048);

    manager.set_quality_profile("ultra").unwrap();
    let budgets = audio.0.lock().unwrap();
    assert_eq!(*budgets, vec![80.0, 40.0]);
}

#[test]
fn adaptation_history_is_capped() {
    let config = AdaptiveConfig {
        max_adaptation_history: 3,
        ..Default::default()
    };
    let (mut manager, _clock) = manager_on(StaticCapabilities::default(), config);

    for name in ["potato", "low", "medium", "high", "ultra"] {
        manager.set_quality_profile(name).unwrap();
    }
    let kept: Vec<&str> = manager
        .adaptation_history()
        .map(|r| r.profile.as_str())
        .collect();
    assert_eq!(kept, vec!["medium", "high", "ultra"]);
}

#[derive(Debug)]
struct SlowRendering;

#[async_trait]
impl MetricCollector for SlowRendering {
    fn name(&self) -> &str {
        "rendering"
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::rendering(RenderingMetrics {
            fps: 12.0,
            frame_times: vec![83.0; 10],
            ..Default::default()
        }))
    }
}

#[tokio::test]
async fn attached_manager_follows_the_monitor() {
    let clock = Arc::new(ManualClock::new(0));
    let monitor = PerformanceMonitor::builder(MonitorConfig::default())
        .clock(clock.clone())
        .collector(Arc::new(SlowRendering))
        .build()
        .unwrap();
    let manager = Arc::new(Mutex::new(
        AdaptiveQualityManager::builder(AdaptiveConfig::default())
            .capabilities(high_end())
            .clock(clock.clone())
            .build(),
    ));

    let subscription = attach(manager.clone(), &monitor);
    monitor.collect_now().await;
    assert_eq!(manager.lock().unwrap().current_profile().name, "low");

    assert!(subscription.unsubscribe());
    clock.advance_ms(10_000);
    monitor.collect_now().await;
    assert_eq!(manager.lock().unwrap().current_profile().name, "low");
}

#[tokio::test]
async fn startup_tick_without_frames_keeps_the_profile() {
    let clock = Arc::new(ManualClock::new(0));
    let rendering = Arc::new(RenderingCollector::new());
    let monitor = PerformanceMonitor::builder(MonitorConfig::default())
        .clock(clock.clone())
        .collector(rendering.clone())
        .build()
        .unwrap();
    let manager = Arc::new(Mutex::new(
        AdaptiveQualityManager::builder(AdaptiveConfig::default())
            .clock(clock.clone())
            .build(),
    ));
    let _subscription = attach(manager.clone(), &monitor);

    monitor.start().await;
    assert_eq!(monitor.metrics().rendering.fps, 0.0);
    for _ in 0..3 {
        clock.advance_ms(6_000);
        monitor.collect_now().await;
    }
    monitor.stop().await;

    let manager = manager.lock().unwrap();
    assert_eq!(manager.current_profile().name, "medium");
    assert!(manager.last_adaptation().is_none());
}

#[test]
fn missing_frames_leave_other_signals_in_charge() {
    let (mut manager, _clock) = manager_on(high_end(), AdaptiveConfig::default());

    let mut no_frames = PerformanceSnapshot::empty(0);
    no_frames.memory.heap_used = 950;
    no_frames.memory.heap_limit = 1000;
    let record = manager.process_metrics(&no_frames).unwrap();
    assert_eq!(record.reason, AdaptationReason::CriticalMemoryPressure);
}
