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

//! The contract every metric collector implements.
//!
//! "Collecting" is distinct from "alerting": a collector actively samples one
//! performance domain (rendering, memory, audio, device) and hands back the
//! sub-record it owns. The `pacer-telemetry` monitor holds a set of collectors
//! and fans out to them once per tick.

use crate::telemetry::snapshot::PartialSnapshot;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Why a collector could not produce its fragment this tick.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// The measured resource is not reachable right now.
    #[error("collector '{collector}' unavailable: {reason}")]
    Unavailable {
        /// Collector name.
        collector: String,
        /// What is missing.
        reason: String,
    },
    /// Sampling failed.
    #[error("collector '{collector}' failed: {reason}")]
    Failed {
        /// Collector name.
        collector: String,
        /// Failure description.
        reason: String,
    },
    /// Sampling did not finish within the allotted time.
    #[error("collector '{collector}' timed out after {timeout:?}")]
    TimedOut {
        /// Collector name.
        collector: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },
    /// The collector panicked.
    #[error("collector '{collector}' panicked")]
    Panicked {
        /// Collector name.
        collector: String,
    },
}

impl CollectorError {
    /// Shorthand for [`CollectorError::Failed`].
    pub fn failed(collector: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectorError::Failed {
            collector: collector.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CollectorError::Unavailable`].
    pub fn unavailable(collector: impl Into<String>, reason: impl Into<String>) -> Self {
        CollectorError::Unavailable {
            collector: collector.into(),
            reason: reason.into(),
        }
    }
}

/// Result type returned by collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

/// A pluggable sampler owning one metric domain.
///
/// Implementations must return from [`collect`](MetricCollector::collect)
/// within a small, bounded time, and must treat missing optional inputs (no
/// audio context, no renderer reference, no battery API) as a normal path that
/// produces defaulted values rather than an error. A collector that wraps an
/// operation which can stall applies its own timeout and falls back to a
/// default.
#[async_trait]
pub trait MetricCollector: Send + Sync + Debug + 'static {
    /// A unique, human-readable identifier.
    fn name(&self) -> &str;

    /// Disabled collectors are skipped by the monitor.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called once when the monitor starts.
    async fn initialize(&self) -> CollectorResult<()> {
        Ok(())
    }

    /// Called once when the monitor stops.
    async fn cleanup(&self) -> CollectorResult<()> {
        Ok(())
    }

    /// Samples the domain and returns the sub-record(s) this collector owns.
    async fn collect(&self) -> CollectorResult<PartialSnapshot>;
}
