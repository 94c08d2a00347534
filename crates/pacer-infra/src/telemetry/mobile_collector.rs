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

//! Mobile device collector: battery, network, touch latency and orientation.

use async_trait::async_trait;
use pacer_core::platform::{BatteryStatus, DeviceSensors};
use pacer_core::telemetry::{
    CollectorResult, MetricCollector, MobileMetrics, NetworkType, Orientation, PartialSnapshot,
};
use pacer_core::utils::clock::{Clock, MonotonicClock};
use pacer_core::utils::sync::lock_or_recover;
use pacer_core::RingBuffer;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TOUCH_WINDOW: usize = 30;
const ORIENTATION_HISTORY: usize = 10;

const MOBILE_KEYWORDS: &[&str] = &[
    "android",
    "iphone",
    "ipad",
    "ipod",
    "mobile",
    "blackberry",
    "iemobile",
    "opera mini",
    "webos",
];

/// What the host knows about the device before any sensor is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceHints {
    /// User-agent or platform identification string.
    pub user_agent: String,
    /// Whether touch input is available.
    pub touch_support: bool,
    /// Viewport width in logical pixels.
    pub viewport_width: u32,
}

/// Tunables for [`MobileCollector`].
#[derive(Debug, Clone, PartialEq)]
pub struct MobileCollectorOptions {
    /// Upper bound on a battery query before the last known value is used.
    pub battery_timeout: Duration,
    /// Touch devices at most this wide are classified as mobile.
    pub narrow_viewport_px: u32,
}

impl Default for MobileCollectorOptions {
    fn default() -> Self {
        Self {
            battery_timeout: Duration::from_millis(250),
            narrow_viewport_px: 768,
        }
    }
}

/// Heuristic mobile detection: a mobile keyword in the user agent, or touch
/// support on a narrow viewport.
pub fn is_mobile_device(hints: &DeviceHints, narrow_viewport_px: u32) -> bool {
    let agent = hints.user_agent.to_lowercase();
    MOBILE_KEYWORDS.iter().any(|k| agent.contains(k))
        || (hints.touch_support && hints.viewport_width <= narrow_viewport_px)
}

/// One recorded orientation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrientationChange {
    /// New orientation.
    pub orientation: Orientation,
    /// When the change was observed, in milliseconds.
    pub timestamp: u64,
}

#[derive(Debug, Default)]
struct MobileState {
    touch_latency: RingBuffer<f64, TOUCH_WINDOW>,
    touch_started_ms: Option<u64>,
    last_orientation: Option<Orientation>,
    orientation_history: VecDeque<OrientationChange>,
    last_battery: Option<BatteryStatus>,
}

/// Samples device state on mobile-classified hosts.
///
/// The collector disables itself when the device is not classified as
/// mobile, so the snapshot's mobile group stays absent on desktops.
pub struct MobileCollector {
    enabled: bool,
    options: MobileCollectorOptions,
    sensors: Option<Arc<dyn DeviceSensors>>,
    clock: Arc<dyn Clock>,
    state: Mutex<MobileState>,
}

impl fmt::Debug for MobileCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MobileCollector")
            .field("enabled", &self.enabled)
            .field("has_sensors", &self.sensors.is_some())
            .finish_non_exhaustive()
    }
}

impl MobileCollector {
    /// Classifies the device from `hints` and creates the collector.
    pub fn new(hints: &DeviceHints, options: MobileCollectorOptions) -> Self {
        let enabled = is_mobile_device(hints, options.narrow_viewport_px);
        if !enabled {
            log::debug!("MobileCollector: device not classified as mobile, disabled.");
        }
        Self {
            enabled,
            options,
            sensors: None,
            clock: Arc::new(MonotonicClock::new()),
            state: Mutex::new(MobileState::default()),
        }
    }

    /// Reads battery, network and orientation from `sensors`.
    pub fn with_sensors(mut self, sensors: Arc<dyn DeviceSensors>) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Timestamps touch and orientation events with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Marks the start of a touch.
    pub fn touch_start(&self) {
        lock_or_recover(&self.state).touch_started_ms = Some(self.clock.now_ms());
    }

    /// Marks the end of the touch started by the last
    /// [`touch_start`](Self::touch_start).
    pub fn touch_end(&self) {
        let now = self.clock.now_ms();
        let mut state = lock_or_recover(&self.state);
        if let Some(start) = state.touch_started_ms.take() {
            state.touch_latency.push(now.saturating_sub(start) as f64);
        }
    }

    /// Records a touch latency measured by the host, in milliseconds.
    pub fn record_touch_latency(&self, latency_ms: f64) {
        if latency_ms.is_finite() && latency_ms >= 0.0 {
            lock_or_recover(&self.state).touch_latency.push(latency_ms);
        }
    }

    /// Records an orientation reported by the host. Only changes are kept.
    pub fn record_orientation(&self, orientation: Orientation) {
        let now = self.clock.now_ms();
        let mut state = lock_or_recover(&self.state);
        Self::observe_orientation(&mut state, orientation, now);
    }

    /// The last orientation changes, oldest first.
    pub fn orientation_history(&self) -> Vec<OrientationChange> {
        lock_or_recover(&self.state)
            .orientation_history
            .iter()
            .copied()
            .collect()
    }

    fn observe_orientation(state: &mut MobileState, orientation: Orientation, now: u64) {
        if state.last_orientation == Some(orientation) {
            return;
        }
        if state.last_orientation.is_some() {
            state.orientation_history.push_back(OrientationChange {
                orientation,
                timestamp: now,
            });
            while state.orientation_history.len() > ORIENTATION_HISTORY {
                state.orientation_history.pop_front();
            }
        }
        state.last_orientation = Some(orientation);
    }

    async fn read_battery(&self, sensors: &dyn DeviceSensors) -> Option<BatteryStatus> {
        match tokio::time::timeout(self.options.battery_timeout, sensors.battery()).await {
            Ok(Some(status)) => {
                lock_or_recover(&self.state).last_battery = Some(status);
                Some(status)
            }
            Ok(None) => None,
            Err(_) => {
                log::debug!(
                    "MobileCollector: battery query exceeded {:?}, using last known value.",
                    self.options.battery_timeout
                );
                lock_or_recover(&self.state).last_battery
            }
        }
    }

    /// Takes one sample.
    pub async fn sample(&self) -> MobileMetrics {
        let now = self.clock.now_ms();
        let (battery, network, motion, orientation) = match self.sensors.as_deref() {
            Some(sensors) => (
                self.read_battery(sensors).await,
                sensors.network(),
                sensors.supports_device_motion(),
                Some(sensors.orientation()),
            ),
            None => (None, None, false, None),
        };

        let mut state = lock_or_recover(&self.state);
        if let Some(orientation) = orientation {
            Self::observe_orientation(&mut state, orientation, now);
        }
        let clamped_level = battery.map(|b| b.level.clamp(0.0, 1.0));
        MobileMetrics {
            battery_level: clamped_level,
            is_charging: battery.is_some_and(|b| b.charging),
            network_type: network.map_or(NetworkType::Unknown, |n| n.effective_type),
            downlink: network.and_then(|n| n.downlink),
            touch_latency: state.touch_latency.average(),
            supports_device_motion: motion,
            orientation: state.last_orientation.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MetricCollector for MobileCollector {
    fn name(&self) -> &str {
        "mobile"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::mobile(self.sample().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::platform::NetworkInfo;
    use pacer_core::utils::clock::ManualClock;

    fn phone() -> DeviceHints {
        DeviceHints {
            user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile".into(),
            touch_support: true,
            viewport_width: 412,
        }
    }

    struct Sensors {
        battery: Option<BatteryStatus>,
        stall: bool,
        orientation: Mutex<Orientation>,
    }

    #[async_trait]
    impl DeviceSensors for Sensors {
        async fn battery(&self) -> Option<BatteryStatus> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.battery
        }

        fn network(&self) -> Option<NetworkInfo> {
            Some(NetworkInfo {
                effective_type: NetworkType::Cellular4g,
                downlink: Some(12.5),
            })
        }

        fn orientation(&self) -> Orientation {
            *self.orientation.lock().unwrap()
        }
    }

    fn sensors(battery: Option<BatteryStatus>, stall: bool) -> Arc<Sensors> {
        Arc::new(Sensors {
            battery,
            stall,
            orientation: Mutex::new(Orientation::Portrait),
        })
    }

    #[test]
    fn detection_heuristics() {
        assert!(is_mobile_device(&phone(), 768));
        assert!(is_mobile_device(
            &DeviceHints {
                user_agent: "Generic Tablet Browser".into(),
                touch_support: true,
                viewport_width: 600,
            },
            768
        ));
        assert!(!is_mobile_device(
            &DeviceHints {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
                touch_support: true,
                viewport_width: 1920,
            },
            768
        ));
    }

    #[test]
    fn desktop_disables_the_collector() {
        let collector = MobileCollector::new(&DeviceHints::default(), Default::default());
        assert!(!collector.is_enabled());
    }

    #[tokio::test]
    async fn reports_sensor_values() {
        let battery = BatteryStatus {
            level: 0.42,
            charging: true,
        };
        let collector = MobileCollector::new(&phone(), Default::default())
            .with_sensors(sensors(Some(battery), false));

        let metrics = collector.sample().await;
        assert_eq!(metrics.battery_level, Some(0.42));
        assert!(metrics.is_charging);
        assert_eq!(metrics.network_type, NetworkType::Cellular4g);
        assert_eq!(metrics.downlink, Some(12.5));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_battery_falls_back_to_last_value() {
        let collector = MobileCollector::new(&phone(), Default::default())
            .with_sensors(sensors(None, true));
        let metrics = collector.sample().await;
        assert_eq!(metrics.battery_level, None);

        lock_or_recover(&collector.state).last_battery = Some(BatteryStatus {
            level: 0.3,
            charging: false,
        });
        let metrics = collector.sample().await;
        assert_eq!(metrics.battery_level, Some(0.3));
        assert!(!metrics.is_charging);
    }

    #[tokio::test]
    async fn no_sensors_reports_defaults() {
        let collector = MobileCollector::new(&phone(), Default::default());
        let metrics = collector.sample().await;
        assert_eq!(metrics, MobileMetrics::default());
    }

    #[test]
    fn touch_latency_from_markers() {
        let clock = ManualClock::new(0);
        let collector = MobileCollector::new(&phone(), Default::default())
            .with_clock(Arc::new(clock.clone()));

        collector.touch_start();
        clock.advance_ms(40);
        collector.touch_end();
        collector.record_touch_latency(60.0);
        collector.touch_end();

        let state = lock_or_recover(&collector.state);
        assert_eq!(state.touch_latency.count(), 2);
        assert_eq!(state.touch_latency.average(), 50.0);
    }

    #[tokio::test]
    async fn orientation_history_is_capped() {
        let clock = ManualClock::new(0);
        let device = sensors(None, false);
        let collector = MobileCollector::new(&phone(), Default::default())
            .with_sensors(device.clone())
            .with_clock(Arc::new(clock.clone()));

        collector.sample().await;
        assert!(collector.orientation_history().is_empty());

        for i in 0..15 {
            clock.advance_ms(100);
            let next = if i % 2 == 0 {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            };
            *device.orientation.lock().unwrap() = next;
            collector.sample().await;
        }
        let history = collector.orientation_history();
        assert_eq!(history.len(), 10);
        assert_eq!(history.last().map(|c| c.timestamp), Some(1_500));
        assert_eq!(history.last().map(|c| c.orientation), Some(Orientation::Landscape));
    }
}
