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

//! Performance monitoring for real-time interactive applications.
//!
//! The [`PerformanceMonitor`] samples a set of
//! [`MetricCollector`](pacer_core::telemetry::MetricCollector)s on a fixed
//! interval, merges their fragments into one
//! [`PerformanceSnapshot`](pacer_core::telemetry::PerformanceSnapshot), keeps a
//! bounded [`PerformanceHistory`], evaluates threshold [`AlertEngine`] rules and
//! notifies subscribers.

#![warn(missing_docs)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod service;
pub mod storage;
pub mod store;
pub mod utils;

pub use alerting::{AlertEngine, AlertEvaluation};
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use monitoring::{CollectorOutcome, CollectorRegistry};
pub use service::{
    MonitorBuilder, MonitorStatus, PerformanceExport, PerformanceMonitor, Subscriber, Subscription,
};
pub use storage::{PerformanceHistory, PerformanceSummary};
pub use store::StoreAdapter;
