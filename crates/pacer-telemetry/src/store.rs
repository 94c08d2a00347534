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

//! Mirrors monitor output into an application state store.

use pacer_core::platform::{StoreSink, StoreUpdate};
use pacer_core::telemetry::{PerformanceAlert, PerformanceSnapshot};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Pushes each snapshot and the unresolved alerts to a [`StoreSink`].
///
/// The dashboard flag is only ever raised, never cleared: hiding the dashboard
/// is left to the application.
#[derive(Clone)]
pub struct StoreAdapter {
    sink: Arc<dyn StoreSink>,
}

impl fmt::Debug for StoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAdapter").finish_non_exhaustive()
    }
}

impl StoreAdapter {
    /// Wraps a store.
    pub fn new(sink: Arc<dyn StoreSink>) -> Self {
        Self { sink }
    }

    /// Builds the update for one tick.
    pub fn update_for(snapshot: &PerformanceSnapshot, alerts: &[PerformanceAlert]) -> StoreUpdate {
        let needs_attention = alerts.iter().any(PerformanceAlert::needs_attention);
        StoreUpdate {
            performance_metrics: Some(snapshot.clone()),
            performance_alerts: Some(alerts.to_vec()),
            show_performance_dashboard: needs_attention.then_some(true),
            ..Default::default()
        }
    }

    /// Pushes one tick. Store failures are logged and swallowed.
    pub fn push(&self, snapshot: &PerformanceSnapshot, alerts: &[PerformanceAlert]) {
        let update = Self::update_for(snapshot, alerts);
        match catch_unwind(AssertUnwindSafe(|| self.sink.set_state(update))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("State store rejected performance update: {:#}", e),
            Err(_) => log::error!("State store panicked while applying performance update."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacer_core::telemetry::{AlertRule, AlertSeverity, ComparisonOperator};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore(Mutex<Vec<StoreUpdate>>);

    impl StoreSink for RecordingStore {
        fn set_state(&self, update: StoreUpdate) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(update);
            Ok(())
        }
    }

    struct FailingStore;

    impl StoreSink for FailingStore {
        fn set_state(&self, _update: StoreUpdate) -> anyhow::Result<()> {
            anyhow::bail!("read-only store")
        }
    }

    fn alert(severity: AlertSeverity) -> PerformanceAlert {
        let rule = AlertRule::new(
            "r",
            "Rule",
            "rendering.fps",
            ComparisonOperator::Lt,
            30.0,
            severity,
        );
        PerformanceAlert::from_rule(&rule, 10.0, 0)
    }

    #[test]
    fn critical_unacknowledged_alert_raises_dashboard_flag() {
        let store = Arc::new(RecordingStore::default());
        let adapter = StoreAdapter::new(store.clone());
        let snapshot = PerformanceSnapshot::empty(1);

        adapter.push(&snapshot, &[alert(AlertSeverity::Warning)]);
        adapter.push(&snapshot, &[alert(AlertSeverity::Critical)]);

        let updates = store.0.lock().unwrap();
        assert_eq!(updates[0].show_performance_dashboard, None);
        assert_eq!(updates[1].show_performance_dashboard, Some(true));
        assert_eq!(updates[1].performance_alerts.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn acknowledged_critical_does_not_raise_flag() {
        let mut acknowledged = alert(AlertSeverity::Critical);
        acknowledged.acknowledged = true;
        let update = StoreAdapter::update_for(&PerformanceSnapshot::empty(0), &[acknowledged]);
        assert_eq!(update.show_performance_dashboard, None);
    }

    #[test]
    fn store_errors_are_swallowed() {
        let adapter = StoreAdapter::new(Arc::new(FailingStore));
        adapter.push(&PerformanceSnapshot::empty(0), &[]);
    }

    #[test]
    fn update_serializes_with_store_keys() {
        let update = StoreAdapter::update_for(&PerformanceSnapshot::empty(0), &[]);
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("performanceMetrics").is_some());
        assert!(json.get("performanceAlerts").is_some());
        assert!(json.get("showPerformanceDashboard").is_none());
    }
}
