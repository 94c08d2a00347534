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

//! User-experience collector fed by application events.

use async_trait::async_trait;
use pacer_core::telemetry::{
    CollectorResult, MetricCollector, PartialSnapshot, UserExperienceMetrics,
};
use pacer_core::utils::sync::lock_or_recover;
use pacer_core::RingBuffer;
use std::sync::Mutex;

const LATENCY_WINDOW: usize = 30;

#[derive(Debug, Default)]
struct InteractionState {
    input_latency: RingBuffer<f64, LATENCY_WINDOW>,
    load_time: f64,
    errors: u64,
    succeeded: u64,
    failed: u64,
}

/// Aggregates input latency, load time, errors and interaction outcomes
/// reported by the application.
#[derive(Debug, Default)]
pub struct InteractionCollector {
    state: Mutex<InteractionState>,
}

impl InteractionCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the time between an input event and its visible response.
    pub fn record_input_latency(&self, latency_ms: f64) {
        if latency_ms.is_finite() && latency_ms >= 0.0 {
            lock_or_recover(&self.state).input_latency.push(latency_ms);
        }
    }

    /// Records the initial load time.
    pub fn record_load_time(&self, load_time_ms: f64) {
        if load_time_ms.is_finite() && load_time_ms >= 0.0 {
            lock_or_recover(&self.state).load_time = load_time_ms;
        }
    }

    /// Counts an application error.
    pub fn record_error(&self) {
        lock_or_recover(&self.state).errors += 1;
    }

    /// Records the outcome of a user interaction.
    pub fn record_interaction(&self, succeeded: bool) {
        let mut state = lock_or_recover(&self.state);
        if succeeded {
            state.succeeded += 1;
        } else {
            state.failed += 1;
        }
    }

    /// Builds the user-experience sub-record.
    pub fn sample(&self) -> UserExperienceMetrics {
        let state = lock_or_recover(&self.state);
        let total = state.succeeded + state.failed;
        let interaction_success = if total == 0 {
            100.0
        } else {
            state.succeeded as f64 / total as f64 * 100.0
        };
        UserExperienceMetrics {
            input_latency: state.input_latency.average(),
            load_time: state.load_time,
            error_count: state.errors,
            interaction_success,
        }
    }
}

#[async_trait]
impl MetricCollector for InteractionCollector {
    fn name(&self) -> &str {
        "user_experience"
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::user_experience(self.sample()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn no_interactions_means_full_success() {
        let metrics = InteractionCollector::new().sample();
        assert_eq!(metrics.interaction_success, 100.0);
        assert_eq!(metrics.error_count, 0);
    }

    #[test]
    fn aggregates_events() {
        let collector = InteractionCollector::new();
        collector.record_input_latency(10.0);
        collector.record_input_latency(30.0);
        collector.record_load_time(1_250.0);
        collector.record_error();
        for outcome in [true, true, true, false] {
            collector.record_interaction(outcome);
        }

        let metrics = collector.sample();
        assert_relative_eq!(metrics.input_latency, 20.0);
        assert_relative_eq!(metrics.load_time, 1_250.0);
        assert_eq!(metrics.error_count, 1);
        assert_relative_eq!(metrics.interaction_success, 75.0);
    }
}
