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

//! # Pacer Control
//!
//! The feedback loop of the workspace. The [`AdaptiveQualityManager`] reads
//! performance snapshots, decides whether the active [`QualityProfile`]
//! should change, and pushes the chosen settings to the renderer, the audio
//! output and the application store.
//!
//! [`QualityProfile`]: pacer_core::QualityProfile

#![warn(missing_docs)]

pub mod analysis;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod service;

pub use analysis::{AdaptationDecision, AdaptationPolicy, AdaptationReason};
pub use config::{AdaptationThresholds, AdaptiveConfig};
pub use context::{classify_tier, derive_constraints, DeviceProfile};
pub use error::{QualityError, QualityResult};
pub use metrics::{PolicyInputs, SampleWindow};
pub use registry::QualityProfileRegistry;
pub use service::{AdaptationRecord, AdaptiveQualityManager, QualityManagerBuilder};

use pacer_core::utils::sync::lock_or_recover;
use pacer_telemetry::{PerformanceMonitor, Subscription};
use std::sync::{Arc, Mutex};

/// Subscribes `manager` to every snapshot `monitor` produces.
///
/// The manager only ever sees snapshots; it never reaches into the monitor.
/// Dropping the returned [`Subscription`] does not detach it, call
/// [`Subscription::unsubscribe`].
pub fn attach(
    manager: Arc<Mutex<AdaptiveQualityManager>>,
    monitor: &PerformanceMonitor,
) -> Subscription {
    monitor.subscribe(move |snapshot, _alerts| {
        lock_or_recover(&manager).process_metrics(snapshot);
        Ok(())
    })
}
