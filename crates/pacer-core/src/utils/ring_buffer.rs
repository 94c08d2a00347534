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

//! Fixed-capacity rolling windows for numerical samples.

/// A fixed-size circular buffer for storing samples.
///
/// Pushing into a full buffer overwrites the oldest value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    index: usize,
    count: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates a new, empty ring buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            index: 0,
            count: 0,
        }
    }

    /// Pushes a new value into the buffer, overwriting the oldest if full.
    pub fn push(&mut self, value: T) {
        if N == 0 {
            return;
        }
        self.data[self.index] = value;
        self.index = (self.index + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Returns the number of elements currently in the buffer.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if nothing has been pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` once the buffer holds `N` values.
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    /// The maximum number of values retained.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Discards every value.
    pub fn clear(&mut self) {
        self.index = 0;
        self.count = 0;
    }

    /// Returns the most recently pushed value.
    pub fn latest(&self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        Some(self.data[(self.index + N - 1) % N])
    }

    /// Returns an iterator over the values in chronological order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (left, right) = self.data.split_at(self.index);
        if self.count < N {
            // Not full yet: the valid values are exactly `left`.
            right[right.len()..].iter().chain(left.iter())
        } else {
            // Full: the oldest value sits at the write index.
            right.iter().chain(left.iter())
        }
    }

    /// Copies the values, oldest first, into a `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f64, N> {
    /// Calculates the arithmetic mean of the values in the buffer.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().sum::<f64>() / self.count as f64
    }

    /// Calculates the population variance of the values in the buffer.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let avg = self.average();
        let sum_sq: f64 = self.iter().map(|v| (v - avg) * (v - avg)).sum();
        sum_sq / self.count as f64
    }

    /// Standard deviation of the values in the buffer.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Ratio of standard deviation to mean, or 0.0 when the mean is zero.
    pub fn coefficient_of_variation(&self) -> f64 {
        let avg = self.average();
        if avg == 0.0 {
            return 0.0;
        }
        self.std_dev() / avg
    }

    /// Returns the minimum value in the buffer, or 0.0 if empty.
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().copied().fold(f64::MAX, f64::min)
    }

    /// Returns the maximum value in the buffer, or 0.0 if empty.
    pub fn max(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Difference between the average of the newer half and the older half.
    ///
    /// Positive when the values are rising.
    pub fn trend(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let half = self.count / 2;
        let first_half_avg = self.iter().take(half).sum::<f64>() / half as f64;
        let last_half_avg = self.iter().skip(self.count - half).sum::<f64>() / half as f64;
        last_half_avg - first_half_avg
    }
}

/// Least-squares slope of `y` over `x`.
///
/// Returns `None` with fewer than two points or when every `x` is identical.
pub fn linear_regression_slope<I>(points: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let points: Vec<(f64, f64)> = points.into_iter().collect();
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, y) in &points {
        numerator += (x - mean_x) * (y - mean_y);
        denominator += (x - mean_x) * (x - mean_x);
    }

    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}
