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

//! Errors raised by the quality controller.

use thiserror::Error;

/// Errors returned by the adaptive quality controller and its configuration.
#[derive(Debug, Error)]
pub enum QualityError {
    /// No profile with this name is registered.
    #[error("unknown quality profile '{0}'")]
    UnknownProfile(String),
    /// The profile table is unusable.
    #[error("invalid quality profile registry: {0}")]
    InvalidRegistry(String),
    /// The configuration could not be (de)serialized.
    #[error("invalid adaptive quality configuration: {0}")]
    Config(#[from] serde_json::Error),
    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for quality control operations.
pub type QualityResult<T> = Result<T, QualityError>;
