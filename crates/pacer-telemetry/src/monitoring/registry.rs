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

//! Registry for metric collectors.

use crate::error::{MonitorError, MonitorResult};
use futures::future::join_all;
use futures::FutureExt;
use pacer_core::telemetry::{CollectorError, CollectorResult, MetricCollector, PartialSnapshot};
use pacer_core::utils::sync::lock_or_recover;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one collector produced during a fan-out.
#[derive(Debug)]
pub struct CollectorOutcome {
    /// Collector name.
    pub collector: String,
    /// The fragment, or why there is none.
    pub result: CollectorResult<PartialSnapshot>,
}

/// A thread-safe registry of metric collectors.
///
/// Collectors are invoked concurrently. Each invocation is bounded by a
/// timeout and isolated from panics, so one misbehaving collector only loses
/// its own fragment.
#[derive(Debug, Clone, Default)]
pub struct CollectorRegistry {
    collectors: Arc<Mutex<Vec<Arc<dyn MetricCollector>>>>,
}

impl CollectorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector. Names are unique.
    pub fn register(&self, collector: Arc<dyn MetricCollector>) -> MonitorResult<()> {
        let mut collectors = lock_or_recover(&self.collectors);
        let name = collector.name().to_string();
        if collectors.iter().any(|c| c.name() == name) {
            return Err(MonitorError::DuplicateCollector(name));
        }
        collectors.push(collector);
        log::info!("Registered metric collector: {}", name);
        Ok(())
    }

    /// Removes a collector by name, returning it if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn MetricCollector>> {
        let mut collectors = lock_or_recover(&self.collectors);
        let index = collectors.iter().position(|c| c.name() == name)?;
        Some(collectors.remove(index))
    }

    /// Names of the registered collectors, in registration order.
    pub fn names(&self) -> Vec<String> {
        lock_or_recover(&self.collectors)
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        lock_or_recover(&self.collectors).len()
    }

    /// `true` when no collector is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every collector.
    pub fn clear(&self) {
        lock_or_recover(&self.collectors).clear();
    }

    fn all(&self) -> Vec<Arc<dyn MetricCollector>> {
        lock_or_recover(&self.collectors).clone()
    }

    /// Initializes every collector. Failures are logged and the collector
    /// stays registered.
    pub async fn initialize_all(&self) {
        let tasks = self.all().into_iter().map(|collector| async move {
            let name = collector.name().to_string();
            match AssertUnwindSafe(collector.initialize()).catch_unwind().await {
                Ok(Ok(())) => log::debug!("Collector '{}' initialized.", name),
                Ok(Err(e)) => log::warn!("Collector '{}' failed to initialize: {}", name, e),
                Err(_) => log::error!("Collector '{}' panicked during initialization.", name),
            }
        });
        join_all(tasks).await;
    }

    /// Cleans up every collector. Failures are logged.
    pub async fn cleanup_all(&self) {
        let tasks = self.all().into_iter().map(|collector| async move {
            let name = collector.name().to_string();
            match AssertUnwindSafe(collector.cleanup()).catch_unwind().await {
                Ok(Ok(())) => log::debug!("Collector '{}' cleaned up.", name),
                Ok(Err(e)) => log::warn!("Collector '{}' failed to clean up: {}", name, e),
                Err(_) => log::error!("Collector '{}' panicked during cleanup.", name),
            }
        });
        join_all(tasks).await;
    }

    /// Invokes every enabled collector concurrently and waits for all of
    /// them, each bounded by `timeout`.
    pub async fn collect_all(&self, timeout: Duration) -> Vec<CollectorOutcome> {
        let tasks = self
            .all()
            .into_iter()
            .filter(|c| c.is_enabled())
            .map(|collector| async move {
                let name = collector.name().to_string();
                let guarded = AssertUnwindSafe(collector.collect()).catch_unwind();
                let bounded = tokio::time::timeout(timeout, guarded);
                let result = match bounded.await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_)) => Err(CollectorError::Panicked {
                        collector: name.clone(),
                    }),
                    Err(_) => Err(CollectorError::TimedOut {
                        collector: name.clone(),
                        timeout,
                    }),
                };
                CollectorOutcome {
                    collector: name,
                    result,
                }
            });
        join_all(tasks).await
    }
}
