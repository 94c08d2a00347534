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

//! # Pacer Core
//!
//! Foundational crate containing the data model, traits and interface contracts
//! shared by the performance monitor and the adaptive quality controller.
//!
//! This crate defines the abstract "what": snapshots, alert rules, quality
//! profiles, device capabilities and the narrow capability interfaces that
//! collectors and sinks implement. `pacer-telemetry` provides the collection
//! service, `pacer-infra` the concrete samplers and `pacer-control` the
//! feedback loop.

#![warn(missing_docs)]

pub mod control;
pub mod platform;
pub mod telemetry;
pub mod utils;

pub use control::quality::{EffectComplexity, QualityProfile};
pub use platform::{DeviceCapabilities, DeviceConstraints, DeviceTier};
pub use telemetry::{
    AlertRule, AlertSeverity, CollectorError, MetricCollector, MetricPath, PartialSnapshot,
    PerformanceAlert, PerformanceSnapshot,
};
pub use utils::clock::{Clock, ManualClock, MonotonicClock};
pub use utils::ring_buffer::RingBuffer;
