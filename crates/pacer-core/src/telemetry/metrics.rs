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

//! Dotted metric paths and their resolution against a snapshot.
//!
//! Alert rules name the metric they watch with a path such as
//! `"rendering.fps"` or `"memory.pressure"`. Paths are parsed into a
//! [`MetricPath`] and resolved through a fixed accessor table, so a rule over a
//! path that does not exist (or over an optional value that is currently
//! absent) simply resolves to `None`.

use crate::telemetry::snapshot::PerformanceSnapshot;
use std::fmt::{self, Display};

type Accessor = fn(&PerformanceSnapshot) -> Option<f64>;

/// Every resolvable path with its accessor.
const METRIC_TABLE: &[(&str, &str, Accessor)] = &[
    ("rendering", "fps", |s| Some(s.rendering.fps)),
    ("rendering", "dropped_frames", |s| {
        Some(s.rendering.dropped_frames as f64)
    }),
    ("rendering", "render_time", |s| Some(s.rendering.render_time)),
    ("rendering", "gpu_time", |s| s.rendering.gpu_time),
    ("rendering", "draw_calls", |s| Some(s.rendering.draw_calls as f64)),
    ("rendering", "triangles", |s| Some(s.rendering.triangles as f64)),
    ("rendering", "average_frame_time", |s| {
        Some(s.rendering.average_frame_time())
    }),
    ("memory", "heap_used", |s| Some(s.memory.heap_used as f64)),
    ("memory", "heap_total", |s| Some(s.memory.heap_total as f64)),
    ("memory", "heap_limit", |s| Some(s.memory.heap_limit as f64)),
    ("memory", "gpu_memory", |s| s.memory.gpu_memory.map(|v| v as f64)),
    ("memory", "textures", |s| Some(s.memory.textures as f64)),
    ("memory", "geometries", |s| Some(s.memory.geometries as f64)),
    ("memory", "materials", |s| Some(s.memory.materials as f64)),
    ("memory", "pressure", |s| Some(s.memory.pressure())),
    ("audio", "latency", |s| Some(s.audio.latency)),
    ("audio", "buffer_size", |s| Some(s.audio.buffer_size as f64)),
    ("audio", "underruns", |s| Some(s.audio.underruns as f64)),
    ("audio", "sample_rate", |s| Some(s.audio.sample_rate as f64)),
    ("mobile", "battery_level", |s| s.battery_level()),
    ("mobile", "is_charging", |s| {
        s.mobile
            .as_ref()
            .map(|m| if m.is_charging { 1.0 } else { 0.0 })
    }),
    ("mobile", "downlink", |s| s.mobile.as_ref().and_then(|m| m.downlink)),
    ("mobile", "touch_latency", |s| {
        s.mobile.as_ref().map(|m| m.touch_latency)
    }),
    ("user_experience", "input_latency", |s| {
        Some(s.user_experience.input_latency)
    }),
    ("user_experience", "load_time", |s| Some(s.user_experience.load_time)),
    ("user_experience", "error_count", |s| {
        Some(s.user_experience.error_count as f64)
    }),
    ("user_experience", "interaction_success", |s| {
        Some(s.user_experience.interaction_success)
    }),
];

/// A structured metric identifier: a namespace and a name.
///
/// Parsed from `"namespace.name"`. camelCase segments are normalized to
/// snake_case, so `"memory.heapUsed"` and `"memory.heap_used"` are the same path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath {
    /// The sub-record (e.g. `"rendering"`, `"memory"`).
    pub namespace: String,
    /// The field within the sub-record (e.g. `"fps"`).
    pub name: String,
}

impl MetricPath {
    /// Creates a path from its two segments.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: to_snake_case(&namespace.into()),
            name: to_snake_case(&name.into()),
        }
    }

    /// Parses a dotted path. Returns `None` unless it has exactly two non-empty segments.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.trim().split('.');
        let namespace = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        if segments.next().is_some() {
            return None;
        }
        Some(Self::new(namespace, name))
    }

    /// Returns `true` if the path names a metric the resolver knows about.
    pub fn is_known(&self) -> bool {
        self.accessor().is_some()
    }

    /// Resolves the path against `snapshot`.
    ///
    /// `None` means the path is unknown or the value is currently absent.
    pub fn resolve(&self, snapshot: &PerformanceSnapshot) -> Option<f64> {
        self.accessor().and_then(|accessor| accessor(snapshot))
    }

    fn accessor(&self) -> Option<Accessor> {
        METRIC_TABLE
            .iter()
            .find(|(namespace, name, _)| *namespace == self.namespace && *name == self.name)
            .map(|(_, _, accessor)| *accessor)
    }

    /// Lists every path the resolver knows about.
    pub fn known_paths() -> impl Iterator<Item = MetricPath> {
        METRIC_TABLE
            .iter()
            .map(|(namespace, name, _)| MetricPath::new(*namespace, *name))
    }
}

impl Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Resolves a dotted path string against a snapshot in one step.
pub fn resolve_metric(snapshot: &PerformanceSnapshot, path: &str) -> Option<f64> {
    MetricPath::parse(path).and_then(|p| p.resolve(snapshot))
}

fn to_snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, c) in segment.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
