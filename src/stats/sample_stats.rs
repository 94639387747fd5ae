use std::ops::{Add, Div};

/// Numeric types that can be accumulated by [`Stats`]
pub trait Sample: Copy + PartialOrd + Add<Output = Self> + Div<Output = Self> {
    const ZERO: Self;

    fn from_count(count: usize) -> Self;
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

macro_rules! impl_sample {
    ($($t:ty),*) => {
        $(
            impl Sample for $t {
                const ZERO: Self = 0 as $t;

                fn from_count(count: usize) -> Self {
                    count as $t
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_sample!(f64, f32, i64, i32, u32);

/// Append-only sample series with memoized aggregates.
///
/// Each aggregate remembers the sample count it was computed at and is
/// recomputed from the whole history only when that count changes.
#[derive(Debug, Clone)]
pub struct Stats<T> {
    data: Vec<T>,
    last_mean_count: usize,
    last_variance_count: usize,
    last_minmax_count: usize,
    mean: T,
    variance: T,
    min: T,
    max: T,
}

impl<T: Sample> Default for Stats<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sample> Stats<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            last_mean_count: 0,
            last_variance_count: 0,
            last_minmax_count: 0,
            mean: T::ZERO,
            variance: T::ZERO,
            min: T::ZERO,
            max: T::ZERO,
        }
    }

    pub fn push(&mut self, data_point: T) {
        self.data.push(data_point);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// # Panics
    ///
    /// Panics if no sample has been pushed.
    pub fn mean(&mut self) -> T {
        assert!(!self.data.is_empty(), "mean of an empty sample set");
        if self.last_mean_count != self.data.len() {
            self.last_mean_count = self.data.len();
            let sum = self.data.iter().fold(T::ZERO, |acc, &x| acc + x);
            self.mean = sum / T::from_count(self.last_mean_count);
        }
        self.mean
    }

    /// Population variance (divides by N)
    ///
    /// Deviations are taken in `f64`, so unsigned samples below the mean
    /// are fine. Integer types truncate the result.
    ///
    /// # Panics
    ///
    /// Panics if no sample has been pushed.
    pub fn variance(&mut self) -> T {
        assert!(!self.data.is_empty(), "variance of an empty sample set");
        if self.last_variance_count != self.data.len() {
            self.last_variance_count = self.data.len();
            let mean = self.mean().to_f64();
            let sum: f64 = self
                .data
                .iter()
                .map(|&x| {
                    let diff = x.to_f64() - mean;
                    diff * diff
                })
                .sum();
            self.variance = T::from_f64(sum / self.last_variance_count as f64);
        }
        self.variance
    }

    pub fn std_dev(&mut self) -> T {
        T::from_f64(self.variance().to_f64().sqrt())
    }

    /// Smallest sample, zero when empty
    pub fn min(&mut self) -> T {
        self.refresh_min_max();
        self.min
    }

    /// Largest sample, zero when empty
    pub fn max(&mut self) -> T {
        self.refresh_min_max();
        self.max
    }

    /// Emit a one-line summary through `tracing`
    pub fn log(&mut self, units: &str) {
        if self.data.is_empty() {
            tracing::info!(units, "no samples");
            return;
        }
        let mean = self.mean().to_f64();
        let std_dev = self.std_dev().to_f64();
        let min = self.min().to_f64();
        let max = self.max().to_f64();
        tracing::info!(
            mean,
            std_dev,
            min,
            max,
            "{:.6} {}\t+/-{:.6}\t[{:.6},{:.6}]",
            mean,
            units,
            std_dev,
            min,
            max
        );
    }

    fn refresh_min_max(&mut self) {
        if self.last_minmax_count == self.data.len() {
            return;
        }
        self.last_minmax_count = self.data.len();
        self.min = T::ZERO;
        self.max = T::ZERO;

        let mut iter = self.data.iter();
        if let Some(&first) = iter.next() {
            let (min, max) = iter.fold((first, first), |(min, max), &x| {
                (
                    if x < min { x } else { min },
                    if x > max { x } else { max },
                )
            });
            self.min = min;
            self.max = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates_of_one_to_five() {
        let mut stats = Stats::<f64>::new();
        for x in 1..=5 {
            stats.push(x as f64);
        }

        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.variance(), 2.0);
        assert!((stats.std_dev() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 5.0);
    }

    #[test]
    fn test_recomputes_after_new_samples() {
        let mut stats = Stats::<f64>::new();
        stats.push(2.0);
        assert_eq!(stats.mean(), 2.0);
        assert_eq!(stats.max(), 2.0);

        stats.push(4.0);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.variance(), 1.0);
        assert_eq!(stats.max(), 4.0);
        assert_eq!(stats.min(), 2.0);
    }

    #[test]
    fn test_min_max_default_to_zero_when_empty() {
        let mut stats = Stats::<i64>::new();
        assert_eq!(stats.min(), 0);
        assert_eq!(stats.max(), 0);
    }

    #[test]
    fn test_negative_samples() {
        let mut stats = Stats::<i64>::new();
        for x in [-3, 7, -10, 2] {
            stats.push(x);
        }
        assert_eq!(stats.min(), -10);
        assert_eq!(stats.max(), 7);
        assert_eq!(stats.mean(), -1);
    }

    #[test]
    fn test_unsigned_samples_below_mean() {
        let mut stats = Stats::<u32>::new();
        for x in [1, 2, 3] {
            stats.push(x);
        }
        assert_eq!(stats.mean(), 2);
        // 2/3 truncates
        assert_eq!(stats.variance(), 0);

        stats.push(10);
        stats.push(4);
        // mean 4, squared deviations 9 + 4 + 1 + 36 + 0
        assert_eq!(stats.mean(), 4);
        assert_eq!(stats.variance(), 10);
        assert_eq!(stats.std_dev(), 3);
        assert_eq!(stats.min(), 1);
        assert_eq!(stats.max(), 10);
    }

    #[test]
    #[should_panic(expected = "empty sample set")]
    fn test_mean_of_empty_set_panics() {
        let mut stats = Stats::<f64>::new();
        stats.mean();
    }

    #[test]
    fn test_log_does_not_disturb_values() {
        let mut stats = Stats::<f64>::new();
        stats.log("kbps");
        stats.push(1.5);
        stats.log("kbps");
        assert_eq!(stats.mean(), 1.5);
        assert_eq!(stats.len(), 1);
    }
}
