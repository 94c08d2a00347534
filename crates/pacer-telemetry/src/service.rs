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

//! The performance monitor: scheduling, collection, history, alerting and
//! subscriber notification.

use crate::alerting::AlertEngine;
use crate::config::MonitorConfig;
use crate::error::MonitorResult;
use crate::monitoring::CollectorRegistry;
use crate::storage::{PerformanceHistory, PerformanceSummary};
use crate::store::StoreAdapter;
use crate::utils::Ticker;
use pacer_core::platform::StoreSink;
use pacer_core::telemetry::{AlertRule, MetricCollector, PerformanceAlert, PerformanceSnapshot};
use pacer_core::utils::clock::{Clock, MonotonicClock};
use pacer_core::utils::sync::lock_or_recover;
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Callback invoked after every tick with the new snapshot and the unresolved
/// alerts.
pub type Subscriber =
    dyn Fn(&PerformanceSnapshot, &[PerformanceAlert]) -> anyhow::Result<()> + Send + Sync;

/// Lifecycle of a [`PerformanceMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Not collecting.
    Stopped,
    /// Collectors are being initialized.
    Starting,
    /// The ticker is active.
    Running,
}

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    entries: Vec<(u64, Arc<Subscriber>)>,
}

/// Handle returned by [`PerformanceMonitor::subscribe`].
///
/// Dropping the handle leaves the subscriber attached; call
/// [`unsubscribe`](Subscription::unsubscribe) to detach it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Mutex<SubscriberList>>,
}

impl Subscription {
    /// Identifier of the subscriber within its monitor.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detaches the subscriber. Returns `false` if it was already gone or the
    /// monitor has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(subscribers) = self.subscribers.upgrade() else {
            return false;
        };
        let mut list = lock_or_recover(&subscribers);
        let before = list.entries.len();
        list.entries.retain(|(id, _)| *id != self.id);
        list.entries.len() != before
    }
}

impl fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Everything the monitor knows, in serialisable form.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceExport {
    /// Export time on the monitor's clock, in milliseconds.
    pub exported_at: u64,
    /// Active configuration.
    pub config: MonitorConfig,
    /// Most recent snapshot.
    pub current: PerformanceSnapshot,
    /// Retained history, oldest first.
    pub history: Vec<PerformanceSnapshot>,
    /// Retained alerts, resolved ones included.
    pub alerts: Vec<PerformanceAlert>,
    /// Registered rules.
    pub rules: Vec<AlertRule>,
    /// Aggregates over the history.
    pub summary: PerformanceSummary,
}

#[derive(Debug)]
struct MonitorState {
    status: MonitorStatus,
    current: PerformanceSnapshot,
    history: PerformanceHistory,
    alerts: AlertEngine,
}

struct MonitorInner {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    collectors: CollectorRegistry,
    state: Mutex<MonitorState>,
    subscribers: Arc<Mutex<SubscriberList>>,
    store: Mutex<Option<StoreAdapter>>,
}

impl MonitorInner {
    /// Runs one collection cycle.
    async fn tick(&self) -> PerformanceSnapshot {
        let outcomes = self
            .collectors
            .collect_all(self.config.collector_timeout())
            .await;

        let (snapshot, active) = {
            let mut state = lock_or_recover(&self.state);
            let timestamp = self.clock.now_ms().max(state.current.timestamp);
            let mut snapshot = PerformanceSnapshot::empty(timestamp);
            for outcome in outcomes {
                match outcome.result {
                    Ok(fragment) => snapshot.merge(fragment),
                    Err(e) => log::warn!("PerformanceMonitor: skipping fragment: {}", e),
                }
            }

            state.current = snapshot.clone();
            let MonitorState {
                history, alerts, ..
            } = &mut *state;
            history.push(snapshot.clone());
            let evaluation = alerts.evaluate(&snapshot);
            if !evaluation.is_empty() {
                log::debug!(
                    "PerformanceMonitor: {} alert(s) raised, {} resolved at {} ms.",
                    evaluation.raised.len(),
                    evaluation.resolved.len(),
                    timestamp
                );
            }
            (snapshot, alerts.active_alerts())
        };

        log::trace!(
            "PerformanceMonitor: tick at {} ms, fps={:.1}, {} active alert(s).",
            snapshot.timestamp,
            snapshot.rendering.fps,
            active.len()
        );

        self.notify(&snapshot, &active);
        if let Some(store) = lock_or_recover(&self.store).clone() {
            store.push(&snapshot, &active);
        }
        snapshot
    }

    fn notify(&self, snapshot: &PerformanceSnapshot, alerts: &[PerformanceAlert]) {
        let subscribers: Vec<(u64, Arc<Subscriber>)> =
            lock_or_recover(&self.subscribers).entries.clone();
        for (id, subscriber) in subscribers {
            match catch_unwind(AssertUnwindSafe(|| subscriber(snapshot, alerts))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("PerformanceMonitor: subscriber {} failed: {:#}", id, e),
                Err(_) => log::error!("PerformanceMonitor: subscriber {} panicked.", id),
            }
        }
    }
}

/// Builds a [`PerformanceMonitor`].
pub struct MonitorBuilder {
    config: MonitorConfig,
    clock: Option<Arc<dyn Clock>>,
    collectors: Vec<Arc<dyn MetricCollector>>,
    store: Option<Arc<dyn StoreSink>>,
}

impl MonitorBuilder {
    /// Uses `clock` for snapshot timestamps instead of the monotonic clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registers a collector.
    pub fn collector(mut self, collector: Arc<dyn MetricCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Mirrors every tick into `sink`.
    pub fn store(mut self, sink: Arc<dyn StoreSink>) -> Self {
        self.store = Some(sink);
        self
    }

    /// Builds the monitor in the stopped state.
    ///
    /// Fails on duplicate rule ids or collector names.
    pub fn build(self) -> MonitorResult<PerformanceMonitor> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let mut alerts = AlertEngine::new(self.config.max_retained_resolved_alerts);
        for rule in self.config.initial_rules() {
            alerts.add_rule(rule)?;
        }

        let collectors = CollectorRegistry::new();
        for collector in self.collectors {
            collectors.register(collector)?;
        }

        let state = MonitorState {
            status: MonitorStatus::Stopped,
            current: PerformanceSnapshot::empty(clock.now_ms()),
            history: PerformanceHistory::new(
                self.config.history_max_length,
                self.config.history_time_range_ms,
            ),
            alerts,
        };

        Ok(PerformanceMonitor {
            inner: Arc::new(MonitorInner {
                config: self.config,
                clock,
                collectors,
                state: Mutex::new(state),
                subscribers: Arc::new(Mutex::new(SubscriberList::default())),
                store: Mutex::new(self.store.map(StoreAdapter::new)),
            }),
            ticker: Mutex::new(None),
        })
    }
}

/// Samples registered collectors on a fixed interval, keeps a bounded
/// history, evaluates alert rules and notifies subscribers.
///
/// Every instance is independent. Collection runs on the tokio runtime that
/// called [`start`](PerformanceMonitor::start).
pub struct PerformanceMonitor {
    inner: Arc<MonitorInner>,
    ticker: Mutex<Option<Ticker>>,
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("status", &self.status())
            .field("collectors", &self.inner.collectors.names())
            .finish_non_exhaustive()
    }
}

impl PerformanceMonitor {
    /// Starts building a monitor with `config`.
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder {
            config,
            clock: None,
            collectors: Vec::new(),
            store: None,
        }
    }

    /// Creates a monitor with no collectors, using the monotonic clock.
    pub fn new(config: MonitorConfig) -> MonitorResult<Self> {
        Self::builder(config).build()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> MonitorStatus {
        lock_or_recover(&self.inner.state).status
    }

    /// `true` while the ticker is active.
    pub fn is_running(&self) -> bool {
        self.status() == MonitorStatus::Running
    }

    /// The active configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Registers a collector. It takes part from the next tick on; it is only
    /// initialized if the monitor is started afterwards.
    pub fn register_collector(&self, collector: Arc<dyn MetricCollector>) -> MonitorResult<()> {
        self.inner.collectors.register(collector)
    }

    /// Removes a collector by name.
    pub fn unregister_collector(&self, name: &str) -> Option<Arc<dyn MetricCollector>> {
        self.inner.collectors.unregister(name)
    }

    /// Names of the registered collectors.
    pub fn collector_names(&self) -> Vec<String> {
        self.inner.collectors.names()
    }

    /// Connects or replaces the state store. `None` disconnects it.
    pub fn connect_store(&self, sink: Option<Arc<dyn StoreSink>>) {
        *lock_or_recover(&self.inner.store) = sink.map(StoreAdapter::new);
    }

    /// Starts collecting.
    ///
    /// Initializes every collector, performs one collection before returning,
    /// then ticks every [`MonitorConfig::interval_ms`]. Calling it while
    /// already started logs a warning and does nothing.
    pub async fn start(&self) {
        {
            let mut state = lock_or_recover(&self.inner.state);
            if state.status != MonitorStatus::Stopped {
                log::warn!(
                    "PerformanceMonitor: start() called while {:?}; ignoring.",
                    state.status
                );
                return;
            }
            state.status = MonitorStatus::Starting;
        }

        self.inner.collectors.initialize_all().await;
        self.inner.tick().await;

        let mut state = lock_or_recover(&self.inner.state);
        if state.status != MonitorStatus::Starting {
            log::debug!("PerformanceMonitor: stopped during startup.");
            return;
        }
        let inner = Arc::clone(&self.inner);
        let ticker = Ticker::spawn(self.inner.config.interval(), move || {
            let inner = Arc::clone(&inner);
            async move {
                inner.tick().await;
            }
        });
        *lock_or_recover(&self.ticker) = Some(ticker);
        state.status = MonitorStatus::Running;
        log::info!(
            "PerformanceMonitor: started with {} collector(s), interval {:?}.",
            self.inner.collectors.len(),
            self.inner.config.interval()
        );
    }

    /// Stops collecting.
    ///
    /// No tick runs after this returns. Collectors are cleaned up
    /// individually; failures are logged. Stopping a stopped monitor does
    /// nothing. The last snapshot stays readable.
    pub async fn stop(&self) {
        let ticker = lock_or_recover(&self.ticker).take();
        let previous = {
            let mut state = lock_or_recover(&self.inner.state);
            std::mem::replace(&mut state.status, MonitorStatus::Stopped)
        };
        if let Some(ticker) = ticker {
            ticker.shutdown().await;
        }
        if previous == MonitorStatus::Stopped {
            return;
        }
        self.inner.collectors.cleanup_all().await;
        log::info!("PerformanceMonitor: stopped.");
    }

    /// Stops the monitor and releases its collectors, subscribers and store.
    pub async fn destroy(&self) {
        self.stop().await;
        self.inner.collectors.clear();
        lock_or_recover(&self.inner.subscribers).entries.clear();
        *lock_or_recover(&self.inner.store) = None;
        log::debug!("PerformanceMonitor: destroyed.");
    }

    /// Runs one collection cycle immediately, independent of the ticker.
    pub async fn collect_now(&self) -> PerformanceSnapshot {
        self.inner.tick().await
    }

    /// The most recent snapshot. Before the first tick this is an all-default
    /// snapshot.
    pub fn metrics(&self) -> PerformanceSnapshot {
        lock_or_recover(&self.inner.state).current.clone()
    }

    /// Retained history, oldest first, optionally limited to the trailing
    /// `duration`.
    pub fn history(&self, duration: Option<Duration>) -> Vec<PerformanceSnapshot> {
        let state = lock_or_recover(&self.inner.state);
        match duration {
            Some(duration) => {
                let now = self.inner.clock.now_ms().max(state.current.timestamp);
                let window = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                state.history.since(now.saturating_sub(window))
            }
            None => state.history.to_vec(),
        }
    }

    /// Registers `callback` to run after every tick.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PerformanceSnapshot, &[PerformanceAlert]) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let subscriber: Arc<Subscriber> = Arc::new(callback);
        let mut list = lock_or_recover(&self.inner.subscribers);
        let id = list.next_id;
        list.next_id += 1;
        list.entries.push((id, subscriber));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.inner.subscribers),
        }
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.inner.subscribers).entries.len()
    }

    /// Adds an alert rule. Rule ids are unique.
    pub fn add_alert(&self, rule: AlertRule) -> MonitorResult<()> {
        lock_or_recover(&self.inner.state).alerts.add_rule(rule)
    }

    /// Removes an alert rule and resolves its open alert.
    pub fn remove_alert(&self, rule_id: &str) -> MonitorResult<AlertRule> {
        let now = self.inner.clock.now_ms();
        lock_or_recover(&self.inner.state)
            .alerts
            .remove_rule(rule_id, now)
    }

    /// Enables or disables an alert rule.
    pub fn set_alert_enabled(&self, rule_id: &str, enabled: bool) -> MonitorResult<()> {
        lock_or_recover(&self.inner.state)
            .alerts
            .set_rule_enabled(rule_id, enabled)
    }

    /// Registered alert rules.
    pub fn alert_rules(&self) -> Vec<AlertRule> {
        lock_or_recover(&self.inner.state).alerts.rules().to_vec()
    }

    /// Unresolved alerts, oldest first.
    pub fn active_alerts(&self) -> Vec<PerformanceAlert> {
        lock_or_recover(&self.inner.state).alerts.active_alerts()
    }

    /// Every retained alert, resolved ones included.
    pub fn all_alerts(&self) -> Vec<PerformanceAlert> {
        lock_or_recover(&self.inner.state).alerts.alerts().to_vec()
    }

    /// Marks an unresolved alert as acknowledged.
    pub fn acknowledge_alert(&self, alert_id: &str) -> MonitorResult<()> {
        lock_or_recover(&self.inner.state)
            .alerts
            .acknowledge(alert_id)
    }

    /// Resolves an alert by hand.
    pub fn resolve_alert(&self, alert_id: &str) -> MonitorResult<()> {
        let now = self.inner.clock.now_ms();
        lock_or_recover(&self.inner.state)
            .alerts
            .resolve(alert_id, now)
    }

    /// Forgets an alert. If its rule is still violated a fresh alert will be
    /// raised on a later tick.
    pub fn dismiss_alert(&self, alert_id: &str) -> MonitorResult<PerformanceAlert> {
        lock_or_recover(&self.inner.state).alerts.remove(alert_id)
    }

    /// Drops every stored alert.
    pub fn clear_alerts(&self) {
        lock_or_recover(&self.inner.state).alerts.clear_alerts();
    }

    /// Aggregates over the retained history.
    pub fn summary(&self) -> PerformanceSummary {
        lock_or_recover(&self.inner.state).history.summary()
    }

    /// Snapshot of everything the monitor holds.
    pub fn export_data(&self) -> PerformanceExport {
        let state = lock_or_recover(&self.inner.state);
        PerformanceExport {
            exported_at: self.inner.clock.now_ms(),
            config: self.inner.config.clone(),
            current: state.current.clone(),
            history: state.history.to_vec(),
            alerts: state.alerts.alerts().to_vec(),
            rules: state.alerts.rules().to_vec(),
            summary: state.history.summary(),
        }
    }

    /// [`export_data`](Self::export_data) rendered as pretty JSON.
    pub fn export_json(&self) -> MonitorResult<String> {
        Ok(serde_json::to_string_pretty(&self.export_data())?)
    }
}

impl Drop for PerformanceMonitor {
    fn drop(&mut self) {
        // Dropping the ticker aborts its task, which holds the last clone of `inner`.
        if lock_or_recover(&self.ticker).take().is_some() {
            log::debug!("PerformanceMonitor dropped while running; ticker aborted.");
        }
    }
}
