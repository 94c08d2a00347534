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

//! Audio latency and stability collector.

use async_trait::async_trait;
use pacer_core::platform::AudioContextSource;
use pacer_core::telemetry::{
    AudioContextState, AudioMetrics, CollectorResult, MetricCollector, PartialSnapshot,
};
use pacer_core::utils::sync::lock_or_recover;
use pacer_core::RingBuffer;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

const STATS_WINDOW: usize = 60;

/// Tunables for [`AudioCollector`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioCollectorOptions {
    /// Buffer size assumed when the context does not report one, in frames.
    pub buffer_size: u32,
}

impl Default for AudioCollectorOptions {
    fn default() -> Self {
        Self { buffer_size: 256 }
    }
}

/// Rolling statistics over recent audio samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AudioStatistics {
    /// Mean latency in milliseconds.
    pub average_latency: f64,
    /// Lowest latency in milliseconds.
    pub min_latency: f64,
    /// Highest latency in milliseconds.
    pub max_latency: f64,
    /// Standard deviation over mean of the latency.
    pub latency_variation: f64,
    /// Fraction of recent samples taken while the context was running.
    pub context_stability: f64,
    /// Samples in the window.
    pub samples: usize,
}

#[derive(Debug, Default)]
struct AudioState {
    last_state: Option<AudioContextState>,
    underruns: u64,
    latencies: RingBuffer<f64, STATS_WINDOW>,
    running: RingBuffer<f64, STATS_WINDOW>,
}

/// Samples audio output health.
///
/// Latency is the context's base plus output latency when it reports either,
/// otherwise it is estimated from buffer size and sample rate. A context that
/// falls from running to suspended between two samples counts as one
/// underrun. Without a context the collector reports zero latency in the
/// suspended state.
pub struct AudioCollector {
    options: AudioCollectorOptions,
    context: Option<Arc<dyn AudioContextSource>>,
    state: Mutex<AudioState>,
}

impl fmt::Debug for AudioCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioCollector")
            .field("options", &self.options)
            .field("has_context", &self.context.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for AudioCollector {
    fn default() -> Self {
        Self::new(AudioCollectorOptions::default())
    }
}

impl AudioCollector {
    /// Creates a collector without an audio context.
    pub fn new(options: AudioCollectorOptions) -> Self {
        Self {
            options,
            context: None,
            state: Mutex::new(AudioState::default()),
        }
    }

    /// Reads from `context`.
    pub fn with_context(mut self, context: Arc<dyn AudioContextSource>) -> Self {
        self.context = Some(context);
        self
    }

    /// Counts an underrun observed by the host's audio callback.
    pub fn record_underrun(&self) {
        lock_or_recover(&self.state).underruns += 1;
    }

    /// Underruns counted so far.
    pub fn underruns(&self) -> u64 {
        lock_or_recover(&self.state).underruns
    }

    /// Statistics over the recent samples.
    pub fn statistics(&self) -> AudioStatistics {
        let state = lock_or_recover(&self.state);
        AudioStatistics {
            average_latency: state.latencies.average(),
            min_latency: state.latencies.min(),
            max_latency: state.latencies.max(),
            latency_variation: state.latencies.coefficient_of_variation(),
            context_stability: state.running.average(),
            samples: state.latencies.count(),
        }
    }

    fn latency_ms(&self, context: &dyn AudioContextSource, buffer_size: u32) -> f64 {
        match (context.base_latency_ms(), context.output_latency_ms()) {
            (None, None) => {
                let rate = context.sample_rate();
                if rate == 0 {
                    0.0
                } else {
                    f64::from(buffer_size) / f64::from(rate) * 1000.0
                }
            }
            (base, output) => base.unwrap_or(0.0) + output.unwrap_or(0.0),
        }
    }

    /// Takes one sample.
    pub fn sample(&self) -> AudioMetrics {
        let mut state = lock_or_recover(&self.state);
        let Some(context) = self.context.as_deref() else {
            return AudioMetrics {
                latency: 0.0,
                buffer_size: self.options.buffer_size,
                underruns: state.underruns,
                context_state: AudioContextState::Suspended,
                sample_rate: 0,
            };
        };

        let context_state = context.state();
        if state.last_state == Some(AudioContextState::Running)
            && context_state == AudioContextState::Suspended
        {
            state.underruns += 1;
            log::debug!("AudioCollector: context suspended while running, counting underrun.");
        }
        state.last_state = Some(context_state);

        let buffer_size = context.buffer_size().unwrap_or(self.options.buffer_size);
        let latency = self.latency_ms(context, buffer_size).max(0.0);
        state.latencies.push(latency);
        state.running.push(if context_state == AudioContextState::Running {
            1.0
        } else {
            0.0
        });

        AudioMetrics {
            latency,
            buffer_size,
            underruns: state.underruns,
            context_state,
            sample_rate: context.sample_rate(),
        }
    }
}

#[async_trait]
impl MetricCollector for AudioCollector {
    fn name(&self) -> &str {
        "audio"
    }

    async fn initialize(&self) -> CollectorResult<()> {
        if self.context.is_none() {
            log::debug!("AudioCollector: no audio context, reporting defaults.");
        }
        Ok(())
    }

    async fn collect(&self) -> CollectorResult<PartialSnapshot> {
        Ok(PartialSnapshot::audio(self.sample()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct FakeContext {
        state: Mutex<AudioContextState>,
        sample_rate: u32,
        base: Option<f64>,
        output: Option<f64>,
    }

    impl FakeContext {
        fn set_state(&self, state: AudioContextState) {
            *self.state.lock().unwrap() = state;
        }
    }

    impl AudioContextSource for FakeContext {
        fn state(&self) -> AudioContextState {
            *self.state.lock().unwrap()
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn base_latency_ms(&self) -> Option<f64> {
            self.base
        }

        fn output_latency_ms(&self) -> Option<f64> {
            self.output
        }
    }

    #[test]
    fn missing_context_reports_defaults() {
        let metrics = AudioCollector::default().sample();
        assert_eq!(metrics.latency, 0.0);
        assert_eq!(metrics.context_state, AudioContextState::Suspended);
    }

    #[test]
    fn reported_latencies_are_summed() {
        let context = Arc::new(FakeContext {
            sample_rate: 48_000,
            base: Some(5.0),
            output: Some(15.0),
            ..Default::default()
        });
        let collector = AudioCollector::default().with_context(context);
        assert_relative_eq!(collector.sample().latency, 20.0);
    }

    #[test]
    fn latency_is_estimated_from_buffer() {
        let context = Arc::new(FakeContext {
            sample_rate: 48_000,
            ..Default::default()
        });
        let collector =
            AudioCollector::new(AudioCollectorOptions { buffer_size: 480 }).with_context(context);
        let metrics = collector.sample();
        assert_relative_eq!(metrics.latency, 10.0);
        assert_eq!(metrics.buffer_size, 480);
    }

    #[test]
    fn running_to_suspended_counts_an_underrun() {
        let context = Arc::new(FakeContext {
            sample_rate: 44_100,
            ..Default::default()
        });
        let collector = AudioCollector::default().with_context(context.clone());

        collector.sample();
        assert_eq!(collector.underruns(), 0);

        context.set_state(AudioContextState::Running);
        collector.sample();
        context.set_state(AudioContextState::Suspended);
        collector.sample();
        collector.sample();
        assert_eq!(collector.underruns(), 1);

        collector.record_underrun();
        assert_eq!(collector.sample().underruns, 2);
    }

    #[test]
    fn statistics_track_stability() {
        let context = Arc::new(FakeContext {
            sample_rate: 48_000,
            base: Some(10.0),
            ..Default::default()
        });
        let collector = AudioCollector::default().with_context(context.clone());

        context.set_state(AudioContextState::Running);
        for _ in 0..3 {
            collector.sample();
        }
        context.set_state(AudioContextState::Closed);
        collector.sample();

        let stats = collector.statistics();
        assert_eq!(stats.samples, 4);
        assert_relative_eq!(stats.context_stability, 0.75);
        assert_relative_eq!(stats.average_latency, 10.0);
        assert_relative_eq!(stats.latency_variation, 0.0);
    }
}
