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

//! Runtime configuration of the performance monitor.

use crate::error::MonitorResult;
use pacer_core::telemetry::AlertRule;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Monitor configuration.
///
/// Every field has a default, so a partial JSON document such as
/// `{"interval_ms": 250}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Collection period in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of snapshots kept in history.
    pub history_max_length: usize,
    /// Maximum age of a history entry relative to the newest one, in milliseconds.
    pub history_time_range_ms: u64,
    /// Time a single collector may take before its fragment is dropped for the tick.
    pub collector_timeout_ms: u64,
    /// Resolved alerts kept for inspection before the oldest are discarded.
    pub max_retained_resolved_alerts: usize,
    /// Registers [`AlertRule::default_rules`] before `rules`.
    pub install_default_rules: bool,
    /// Alert rules registered at construction.
    pub rules: Vec<AlertRule>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            history_max_length: 300,
            history_time_range_ms: 300_000,
            collector_timeout_ms: 500,
            max_retained_resolved_alerts: 100,
            install_default_rules: false,
            rules: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Loads a configuration from a JSON string.
    pub fn from_json(json: &str) -> MonitorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Writes the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> MonitorResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Collection period. Never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Per-collector timeout. Never zero.
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_millis(self.collector_timeout_ms.max(1))
    }

    /// The rules to install at construction, defaults first.
    pub fn initial_rules(&self) -> Vec<AlertRule> {
        let mut rules = if self.install_default_rules {
            AlertRule::default_rules()
        } else {
            Vec::new()
        };
        rules.extend(self.rules.iter().cloned());
        rules
    }
}
