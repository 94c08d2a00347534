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

//! Rule evaluation with duration debouncing and automatic resolution.
//!
//! A rule with a non-zero `duration_ms` only raises an alert once its
//! condition has held in every evaluated snapshot for at least that long. The
//! engine remembers when each rule's current violation run started, so the
//! debounce does not depend on how much history is retained. While a rule is
//! violated it has at most one unresolved alert. The first snapshot in which
//! the condition no longer holds resolves that alert.

use crate::error::{MonitorError, MonitorResult};
use pacer_core::telemetry::{AlertRule, PerformanceAlert, PerformanceSnapshot};
use std::collections::HashMap;

/// Alerts that changed state during one evaluation.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluation {
    /// Newly created alerts.
    pub raised: Vec<PerformanceAlert>,
    /// Alerts resolved because their condition cleared.
    pub resolved: Vec<PerformanceAlert>,
}

impl AlertEvaluation {
    /// `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty() && self.resolved.is_empty()
    }
}

/// Holds the rule set and every alert the rules produced.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    rules: Vec<AlertRule>,
    alerts: Vec<PerformanceAlert>,
    /// Rule id to the timestamp of the first snapshot of its current violation run.
    violating_since: HashMap<String, u64>,
    max_retained_resolved: usize,
}

impl AlertEngine {
    /// Creates an engine that keeps at most `max_retained_resolved` resolved
    /// alerts around for inspection.
    pub fn new(max_retained_resolved: usize) -> Self {
        Self {
            rules: Vec::new(),
            alerts: Vec::new(),
            violating_since: HashMap::new(),
            max_retained_resolved,
        }
    }

    /// Registers a rule. Rule ids are unique.
    ///
    /// Rules whose metric path does not name a known metric are accepted but
    /// never fire.
    pub fn add_rule(&mut self, rule: AlertRule) -> MonitorResult<()> {
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(MonitorError::DuplicateRule(rule.id));
        }
        if !rule.metric_path().is_some_and(|p| p.is_known()) {
            log::warn!(
                "Alert rule '{}' references unknown metric '{}'; it will never fire.",
                rule.id,
                rule.metric
            );
        }
        log::debug!("Registered alert rule '{}' on '{}'.", rule.id, rule.metric);
        self.rules.push(rule);
        Ok(())
    }

    /// Removes a rule and resolves its open alert, if any.
    pub fn remove_rule(&mut self, rule_id: &str, now_ms: u64) -> MonitorResult<AlertRule> {
        let index = self
            .rules
            .iter()
            .position(|r| r.id == rule_id)
            .ok_or_else(|| MonitorError::UnknownRule(rule_id.to_string()))?;
        if let Some(open) = self.open_alert_mut(rule_id) {
            open.resolve(now_ms);
        }
        self.violating_since.remove(rule_id);
        self.prune_resolved();
        Ok(self.rules.remove(index))
    }

    /// Enables or disables a rule. A disabled rule neither raises nor
    /// resolves alerts.
    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> MonitorResult<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| MonitorError::UnknownRule(rule_id.to_string()))?;
        rule.enabled = enabled;
        if !enabled {
            self.violating_since.remove(rule_id);
        }
        Ok(())
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Every retained alert, oldest first.
    pub fn alerts(&self) -> &[PerformanceAlert] {
        &self.alerts
    }

    /// Unresolved alerts, oldest first.
    pub fn active_alerts(&self) -> Vec<PerformanceAlert> {
        self.alerts.iter().filter(|a| !a.resolved).cloned().collect()
    }

    /// Marks an alert as acknowledged. Only unresolved alerts can be
    /// acknowledged.
    pub fn acknowledge(&mut self, alert_id: &str) -> MonitorResult<()> {
        let alert = self.alert_mut(alert_id)?;
        if alert.resolved {
            return Err(MonitorError::AlertResolved(alert_id.to_string()));
        }
        alert.acknowledged = true;
        Ok(())
    }

    /// Resolves an alert by hand. Resolving twice is a no-op.
    pub fn resolve(&mut self, alert_id: &str, now_ms: u64) -> MonitorResult<()> {
        self.alert_mut(alert_id)?.resolve(now_ms);
        self.prune_resolved();
        Ok(())
    }

    /// Forgets an alert entirely.
    pub fn remove(&mut self, alert_id: &str) -> MonitorResult<PerformanceAlert> {
        let index = self
            .alerts
            .iter()
            .position(|a| a.id == alert_id)
            .ok_or_else(|| MonitorError::UnknownAlert(alert_id.to_string()))?;
        Ok(self.alerts.remove(index))
    }

    /// Drops every alert.
    pub fn clear_alerts(&mut self) {
        self.alerts.clear();
    }

    /// Evaluates every enabled rule against `snapshot`.
    ///
    /// Snapshots are expected in timestamp order.
    pub fn evaluate(&mut self, snapshot: &PerformanceSnapshot) -> AlertEvaluation {
        let mut evaluation = AlertEvaluation::default();
        let now = snapshot.timestamp;
        let Self {
            rules,
            alerts,
            violating_since,
            ..
        } = self;

        for rule in rules.iter().filter(|r| r.enabled) {
            let value = rule.metric_path().and_then(|path| path.resolve(snapshot));
            let Some(value) = value else {
                violating_since.remove(&rule.id);
                continue;
            };
            let violated = rule.operator.evaluate(value, rule.threshold);
            if !violated {
                violating_since.remove(&rule.id);
            }
            let open = alerts
                .iter()
                .position(|a| !a.resolved && a.rule_id == rule.id);

            match (violated, open) {
                (true, None) => {
                    let since = *violating_since.entry(rule.id.clone()).or_insert(now);
                    if now.saturating_sub(since) >= rule.duration_ms {
                        let alert = PerformanceAlert::from_rule(rule, value, now);
                        log::warn!("Performance alert raised: {}", alert.message);
                        evaluation.raised.push(alert.clone());
                        alerts.push(alert);
                    }
                }
                (false, Some(index)) => {
                    let alert = &mut alerts[index];
                    alert.resolve(now);
                    log::info!("Performance alert resolved: {}", alert.message);
                    evaluation.resolved.push(alert.clone());
                }
                _ => {}
            }
        }

        if !evaluation.resolved.is_empty() {
            self.prune_resolved();
        }
        evaluation
    }

    fn open_alert_mut(&mut self, rule_id: &str) -> Option<&mut PerformanceAlert> {
        self.alerts
            .iter_mut()
            .find(|a| !a.resolved && a.rule_id == rule_id)
    }

    fn alert_mut(&mut self, alert_id: &str) -> MonitorResult<&mut PerformanceAlert> {
        self.alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| MonitorError::UnknownAlert(alert_id.to_string()))
    }

    fn prune_resolved(&mut self) {
        let resolved = self.alerts.iter().filter(|a| a.resolved).count();
        let mut excess = resolved.saturating_sub(self.max_retained_resolved);
        if excess == 0 {
            return;
        }
        self.alerts.retain(|a| {
            if excess > 0 && a.resolved {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}
