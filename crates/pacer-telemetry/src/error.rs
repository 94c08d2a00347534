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

//! Error type for monitor operations.

use thiserror::Error;

/// Errors returned by [`PerformanceMonitor`](crate::PerformanceMonitor)
/// and its configuration.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No alert with this id is stored.
    #[error("unknown alert '{0}'")]
    UnknownAlert(String),
    /// The alert is already resolved and can no longer be acknowledged.
    #[error("alert '{0}' is already resolved")]
    AlertResolved(String),
    /// No rule with this id is registered.
    #[error("unknown alert rule '{0}'")]
    UnknownRule(String),
    /// A rule with this id is already registered.
    #[error("alert rule '{0}' is already registered")]
    DuplicateRule(String),
    /// A collector with this name is already registered.
    #[error("collector '{0}' is already registered")]
    DuplicateCollector(String),
    /// The configuration could not be (de)serialized.
    #[error("invalid monitor configuration: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
