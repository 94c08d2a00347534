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

//! Declarative alert rules and the alerts they raise.

use crate::telemetry::metrics::MetricPath;
use crate::telemetry::snapshot::PerformanceSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance used by [`ComparisonOperator::Eq`].
const EQ_EPSILON: f64 = 1e-9;

/// How a metric value is compared to a rule's threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// `value > threshold`
    Gt,
    /// `value >= threshold`
    Gte,
    /// `value < threshold`
    Lt,
    /// `value <= threshold`
    Lte,
    /// `value == threshold` (within a small epsilon)
    Eq,
}

impl ComparisonOperator {
    /// Returns `true` if `value` violates `threshold` under this operator.
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::Gt => value > threshold,
            ComparisonOperator::Gte => value >= threshold,
            ComparisonOperator::Lt => value < threshold,
            ComparisonOperator::Lte => value <= threshold,
            ComparisonOperator::Eq => (value - threshold).abs() <= EQ_EPSILON,
        }
    }

    /// The operator's mathematical symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Eq => "==",
        }
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Informational.
    Info,
    /// Degraded but tolerable.
    Warning,
    /// Requires immediate attention.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// Domain an alert belongs to, derived from the rule's metric namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Rendering and frame pacing.
    Performance,
    /// Heap and resource usage.
    Memory,
    /// Audio pipeline.
    Audio,
    /// Battery, network and touch.
    Mobile,
    /// Responsiveness and errors.
    UserExperience,
    /// Anything else.
    Other,
}

impl AlertType {
    /// Classifies a metric path by its namespace.
    pub fn classify(path: &MetricPath) -> Self {
        match path.namespace.as_str() {
            "rendering" => AlertType::Performance,
            "memory" => AlertType::Memory,
            "audio" => AlertType::Audio,
            "mobile" => AlertType::Mobile,
            "user_experience" => AlertType::UserExperience,
            _ => AlertType::Other,
        }
    }
}

/// A declarative threshold condition over one metric path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name used in alert messages.
    pub name: String,
    /// Dotted metric path, e.g. `"rendering.fps"`.
    pub metric: String,
    /// Threshold the metric is compared against.
    pub threshold: f64,
    /// Comparison applied as `metric <operator> threshold`.
    pub operator: ComparisonOperator,
    /// Severity of alerts raised by this rule.
    pub severity: AlertSeverity,
    /// How long, in milliseconds, the condition must hold before an alert is raised.
    #[serde(default)]
    pub duration_ms: u64,
    /// Disabled rules are skipped during evaluation.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// Creates an enabled rule with no sustain duration.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        metric: impl Into<String>,
        operator: ComparisonOperator,
        threshold: f64,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            metric: metric.into(),
            threshold,
            operator,
            severity,
            duration_ms: 0,
            enabled: true,
        }
    }

    /// Sets how long the condition must hold before alerting.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The parsed metric path, `None` if the path is malformed.
    pub fn metric_path(&self) -> Option<MetricPath> {
        MetricPath::parse(&self.metric)
    }

    /// Resolves the rule's metric against `snapshot`.
    pub fn observe(&self, snapshot: &PerformanceSnapshot) -> Option<f64> {
        self.metric_path().and_then(|p| p.resolve(snapshot))
    }

    /// Evaluates the rule against `snapshot`.
    ///
    /// Returns `None` when the metric cannot be resolved, otherwise whether the
    /// condition is violated.
    pub fn is_violated_by(&self, snapshot: &PerformanceSnapshot) -> Option<bool> {
        self.observe(snapshot)
            .map(|value| self.operator.evaluate(value, self.threshold))
    }

    /// A sensible starter set of rules for a 60 FPS interactive application.
    pub fn default_rules() -> Vec<AlertRule> {
        vec![
            AlertRule::new(
                "low_fps",
                "Low frame rate",
                "rendering.fps",
                ComparisonOperator::Lt,
                30.0,
                AlertSeverity::Warning,
            )
            .with_duration_ms(5_000),
            AlertRule::new(
                "critical_fps",
                "Critical frame rate",
                "rendering.fps",
                ComparisonOperator::Lt,
                15.0,
                AlertSeverity::Critical,
            )
            .with_duration_ms(3_000),
            AlertRule::new(
                "high_memory_pressure",
                "High memory pressure",
                "memory.pressure",
                ComparisonOperator::Gt,
                0.85,
                AlertSeverity::Warning,
            )
            .with_duration_ms(10_000),
            AlertRule::new(
                "audio_underruns",
                "Audio buffer underruns",
                "audio.underruns",
                ComparisonOperator::Gt,
                5.0,
                AlertSeverity::Warning,
            ),
            AlertRule::new(
                "high_audio_latency",
                "High audio latency",
                "audio.latency",
                ComparisonOperator::Gt,
                100.0,
                AlertSeverity::Warning,
            )
            .with_duration_ms(5_000),
        ]
    }
}

/// The observation that raised an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    /// Dotted metric path.
    pub metric: String,
    /// Observed value.
    pub value: f64,
    /// Rule threshold.
    pub threshold: f64,
    /// Rule operator.
    pub operator: ComparisonOperator,
}

/// A live or historical alert raised by an [`AlertRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    /// Unique identifier.
    pub id: String,
    /// Identifier of the originating rule.
    pub rule_id: String,
    /// Domain classification.
    pub alert_type: AlertType,
    /// Severity copied from the rule.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// Creation time on the monitor's clock, in milliseconds.
    pub timestamp: u64,
    /// Set once someone has seen the alert.
    pub acknowledged: bool,
    /// Set once the condition stopped holding or the alert was resolved by hand.
    pub resolved: bool,
    /// When the alert was resolved.
    pub resolved_at: Option<u64>,
    /// The observation that raised it.
    pub data: AlertData,
}

impl PerformanceAlert {
    /// Materializes an alert for `rule` from an observed `value`.
    pub fn from_rule(rule: &AlertRule, value: f64, timestamp: u64) -> Self {
        let alert_type = rule
            .metric_path()
            .map(|p| AlertType::classify(&p))
            .unwrap_or(AlertType::Other);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            alert_type,
            severity: rule.severity,
            message: format!(
                "{}: {} is {:.2} ({} {})",
                rule.name,
                rule.metric,
                value,
                rule.operator.symbol(),
                rule.threshold
            ),
            timestamp,
            acknowledged: false,
            resolved: false,
            resolved_at: None,
            data: AlertData {
                metric: rule.metric.clone(),
                value,
                threshold: rule.threshold,
                operator: rule.operator,
            },
        }
    }

    /// Marks the alert as resolved at `timestamp`. Idempotent.
    pub fn resolve(&mut self, timestamp: u64) {
        if !self.resolved {
            self.resolved = true;
            self.resolved_at = Some(timestamp);
        }
    }

    /// `true` for critical alerts nobody has acknowledged yet.
    pub fn needs_attention(&self) -> bool {
        !self.resolved && !self.acknowledged && self.severity == AlertSeverity::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps_rule() -> AlertRule {
        AlertRule::new(
            "fps",
            "Low FPS",
            "rendering.fps",
            ComparisonOperator::Lt,
            30.0,
            AlertSeverity::Warning,
        )
    }

    #[test]
    fn operators_compare_against_threshold() {
        assert!(ComparisonOperator::Gt.evaluate(2.0, 1.0));
        assert!(!ComparisonOperator::Gt.evaluate(1.0, 1.0));
        assert!(ComparisonOperator::Gte.evaluate(1.0, 1.0));
        assert!(ComparisonOperator::Lt.evaluate(0.5, 1.0));
        assert!(ComparisonOperator::Lte.evaluate(1.0, 1.0));
        assert!(ComparisonOperator::Eq.evaluate(1.0, 1.0));
        assert!(!ComparisonOperator::Eq.evaluate(1.1, 1.0));
    }

    #[test]
    fn rule_violation_requires_resolvable_metric() {
        let mut snapshot = PerformanceSnapshot::empty(0);
        snapshot.rendering.fps = 20.0;
        assert_eq!(fps_rule().is_violated_by(&snapshot), Some(true));

        let mut bad = fps_rule();
        bad.metric = "rendering.missing".into();
        assert_eq!(bad.is_violated_by(&snapshot), None);
    }

    #[test]
    fn alert_is_classified_and_described() {
        let alert = PerformanceAlert::from_rule(&fps_rule(), 20.0, 1234);
        assert_eq!(alert.alert_type, AlertType::Performance);
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.timestamp, 1234);
        assert!(alert.message.contains("rendering.fps"));
        assert!(!alert.resolved);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut alert = PerformanceAlert::from_rule(&fps_rule(), 20.0, 0);
        alert.resolve(10);
        alert.resolve(20);
        assert_eq!(alert.resolved_at, Some(10));
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let json = r#"{
            "id": "fps", "name": "Low FPS", "metric": "rendering.fps",
            "threshold": 30.0, "operator": "lt", "severity": "critical"
        }"#;
        let rule: AlertRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.duration_ms, 0);
        assert_eq!(rule.operator, ComparisonOperator::Lt);
    }

    #[test]
    fn default_rules_use_known_metrics() {
        for rule in AlertRule::default_rules() {
            assert!(rule.metric_path().unwrap().is_known(), "{}", rule.metric);
        }
    }
}
