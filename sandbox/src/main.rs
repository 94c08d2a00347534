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

//! Drives the monitor and the quality manager with a synthetic workload.
//!
//! The fake renderer's frame cost scales with the render scale the manager
//! picks, so the loop can be watched settling: a heavy phase pushes quality
//! down, a light phase lets it climb back.
//!
//! Usage: `sandbox [monitor-config.json]`

use anyhow::Result;
use pacer_control::{attach, AdaptiveConfig, AdaptiveQualityManager};
use pacer_core::platform::{GraphicsApi, RenderSink, StoreSink, StoreUpdate};
use pacer_infra::telemetry::MemoryCollectorOptions;
use pacer_infra::{
    InteractionCollector, MemoryCollector, RenderingCollector, SysinfoHost, SysinfoIntrospector,
};
use pacer_telemetry::{MonitorConfig, PerformanceMonitor};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Frame cost at render scale 1.0 while the scene is heavy.
const HEAVY_FRAME_MS: f64 = 55.0;
/// Frame cost at render scale 1.0 once the scene calms down.
const LIGHT_FRAME_MS: f64 = 9.0;
const HEAVY_PHASE: Duration = Duration::from_secs(8);
const RUN_FOR: Duration = Duration::from_secs(20);

/// A renderer stand-in that remembers the render scale it was given.
#[derive(Debug)]
struct SyntheticRenderer {
    scale_bits: AtomicU32,
}

impl SyntheticRenderer {
    fn new() -> Self {
        Self {
            scale_bits: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    fn render_scale(&self) -> f64 {
        f64::from(f32::from_bits(self.scale_bits.load(Ordering::Relaxed)))
    }
}

impl RenderSink for SyntheticRenderer {
    fn set_pixel_ratio(&self, ratio: f32) -> anyhow::Result<()> {
        // Native ratio is 1.0, so the ratio is the scale itself.
        self.scale_bits.store(ratio.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        Some((1280, 720))
    }
}

/// Prints what a UI store would receive.
struct LogStore;

impl StoreSink for LogStore {
    fn set_state(&self, update: StoreUpdate) -> anyhow::Result<()> {
        if let Some(profile) = &update.performance_profile {
            log::info!(
                "Store: profile={} particles={:?} effects={:?}",
                profile,
                update.max_particles,
                update.effect_complexity
            );
        }
        if update.show_performance_dashboard == Some(true) {
            log::warn!("Store: dashboard requested by a critical alert.");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("sysinfo", log::LevelFilter::Warn)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig {
            interval_ms: 500,
            install_default_rules: true,
            ..Default::default()
        },
    };

    let rendering = Arc::new(RenderingCollector::new());
    let interaction = Arc::new(InteractionCollector::new());
    let memory = Arc::new(
        MemoryCollector::new(MemoryCollectorOptions::default())
            .with_introspector(Arc::new(SysinfoIntrospector::new())),
    );

    let monitor = PerformanceMonitor::builder(config)
        .collector(rendering.clone())
        .collector(memory)
        .collector(interaction.clone())
        .store(Arc::new(LogStore))
        .build()?;

    let renderer = Arc::new(SyntheticRenderer::new());
    let manager = Arc::new(Mutex::new(
        AdaptiveQualityManager::builder(AdaptiveConfig::default())
            .capabilities(SysinfoHost::new(GraphicsApi::WebGl2))
            .render_sink(renderer.clone())
            .build(),
    ));
    let subscription = attach(manager.clone(), &monitor);

    monitor.start().await;

    let started = tokio::time::Instant::now();
    while started.elapsed() < RUN_FOR {
        let base = if started.elapsed() < HEAVY_PHASE {
            HEAVY_FRAME_MS
        } else {
            LIGHT_FRAME_MS
        };
        let scale = renderer.render_scale();
        let frame_ms = base * scale * scale;

        rendering.begin_frame();
        tokio::time::sleep(Duration::from_secs_f64(frame_ms / 1000.0)).await;
        rendering.end_frame();
        interaction.record_interaction(true);
    }

    subscription.unsubscribe();
    monitor.stop().await;

    let summary = monitor.summary();
    log::info!(
        "Ran {} samples: avg {:.1} FPS (min {:.1}, max {:.1}), peak memory pressure {:.0}%.",
        summary.sample_count,
        summary.average_fps,
        summary.min_fps,
        summary.max_fps,
        summary.peak_memory_pressure * 100.0
    );

    let manager = pacer_core::utils::sync::lock_or_recover(&manager);
    for record in manager.adaptation_history() {
        log::info!(
            "t={}ms {} -> {} ({})",
            record.timestamp,
            record.previous_profile,
            record.profile,
            record.reason
        );
    }
    log::info!("Final profile: {}", manager.current_profile().name);

    monitor.destroy().await;
    Ok(())
}
