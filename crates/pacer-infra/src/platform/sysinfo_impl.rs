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

//! sysinfo-based capability detection and memory introspection.

use pacer_core::platform::{
    CapabilitySource, DeviceCapabilities, GraphicsApi, HeapStats, MemoryIntrospector,
};
use pacer_core::utils::sync::lock_or_recover;
use std::sync::Mutex;
use sysinfo::System;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Reads core count and installed memory from the host.
///
/// The graphics API and mobile classification cannot be read from the
/// operating system and are supplied by the caller.
#[derive(Debug, Clone)]
pub struct SysinfoHost {
    graphics_api: GraphicsApi,
    is_mobile: bool,
    max_texture_size: Option<u32>,
}

impl SysinfoHost {
    /// Creates a source reporting `graphics_api` as the best available API.
    pub fn new(graphics_api: GraphicsApi) -> Self {
        Self {
            graphics_api,
            is_mobile: false,
            max_texture_size: None,
        }
    }

    /// Marks the host as a mobile device.
    pub fn mobile(mut self, is_mobile: bool) -> Self {
        self.is_mobile = is_mobile;
        self
    }

    /// Reports the renderer's texture size limit.
    pub fn max_texture_size(mut self, size: u32) -> Self {
        self.max_texture_size = Some(size);
        self
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new(GraphicsApi::WebGl2)
    }
}

impl CapabilitySource for SysinfoHost {
    fn detect(&self) -> DeviceCapabilities {
        let mut system = System::new();
        system.refresh_memory();
        let total = system.total_memory();
        let device_memory_gb = (total > 0).then(|| total as f64 / BYTES_PER_GIB);

        let cpu_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        let capabilities = DeviceCapabilities {
            graphics_api: self.graphics_api,
            supports_workers: cpu_cores > 1,
            supports_memory_introspection: total > 0,
            cpu_cores,
            device_memory_gb,
            is_mobile: self.is_mobile,
            max_texture_size: self.max_texture_size,
        };
        log::debug!("SysinfoHost: {:?}", capabilities);
        capabilities
    }
}

/// Reports system memory as the heap numbers: used, total and limit are the
/// host's used and installed RAM.
pub struct SysinfoIntrospector {
    system: Mutex<System>,
}

impl SysinfoIntrospector {
    /// Creates a new introspector.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoIntrospector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIntrospector for SysinfoIntrospector {
    fn heap_stats(&self) -> Option<HeapStats> {
        let mut system = lock_or_recover(&self.system);
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(HeapStats {
            used: system.used_memory(),
            total,
            limit: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_reports_at_least_one_core() {
        let capabilities = SysinfoHost::new(GraphicsApi::WebGpu).detect();
        assert!(capabilities.cpu_cores >= 1);
        assert_eq!(capabilities.graphics_api, GraphicsApi::WebGpu);
        assert!(!capabilities.is_mobile);
    }

    #[test]
    fn builder_flags_are_forwarded() {
        let capabilities = SysinfoHost::default()
            .mobile(true)
            .max_texture_size(4096)
            .detect();
        assert!(capabilities.is_mobile);
        assert_eq!(capabilities.max_texture_size, Some(4096));
    }

    #[test]
    fn introspector_numbers_are_consistent() {
        if let Some(stats) = SysinfoIntrospector::new().heap_stats() {
            assert!(stats.used <= stats.total);
            assert_eq!(stats.total, stats.limit);
        }
    }
}
