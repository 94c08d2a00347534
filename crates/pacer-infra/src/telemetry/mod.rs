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

//! Concrete [`MetricCollector`](pacer_core::telemetry::MetricCollector)
//! implementations, one per snapshot domain.

pub mod audio_collector;
pub mod interaction_collector;
pub mod memory_collector;
pub mod mobile_collector;
pub mod rendering_collector;

pub use self::audio_collector::{AudioCollector, AudioCollectorOptions, AudioStatistics};
pub use self::interaction_collector::InteractionCollector;
pub use self::memory_collector::{
    MemoryCollector, MemoryCollectorOptions, MemoryTrend, ResourceCounts,
};
pub use self::mobile_collector::{
    is_mobile_device, DeviceHints, MobileCollector, MobileCollectorOptions, OrientationChange,
};
pub use self::rendering_collector::{RenderingCollector, FRAME_BUDGET_MS};
