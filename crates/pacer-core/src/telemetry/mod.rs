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

//! Provides the foundational traits and data structures for performance telemetry.
//!
//! This module defines the "common language" of the monitoring pipeline: the
//! snapshot every tick produces, the fragment a collector contributes, the
//! dotted metric paths alert rules are written against, and the alert types
//! themselves.

pub mod alert;
pub mod collector;
pub mod metrics;
pub mod snapshot;

pub use self::alert::{
    AlertData, AlertRule, AlertSeverity, AlertType, ComparisonOperator, PerformanceAlert,
};
pub use self::collector::{CollectorError, CollectorResult, MetricCollector};
pub use self::metrics::MetricPath;
pub use self::snapshot::{
    AudioContextState, AudioMetrics, MemoryMetrics, MobileMetrics, NetworkType, Orientation,
    PartialSnapshot, PerformanceSnapshot, RenderingMetrics, UserExperienceMetrics,
};
