//! Latency statistics utility
//!
//! Provides `LatencyStats` for computing min/avg/max statistics from
//! a collection of latency samples.

/// Statistics for a collection of latency samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    /// Minimum latency in milliseconds
    pub min: f64,
    /// Maximum latency in milliseconds
    pub max: f64,
    /// Average latency in milliseconds
    pub avg: f64,
    /// Number of valid samples
    pub count: usize,
}

impl LatencyStats {
    /// Compute statistics from a slice of samples (in milliseconds).
    ///
    /// Filters out non-finite and negative values before computing.
    ///
    /// # Example
    /// ```
    /// use vultr_latency_common::stats::LatencyStats;
    ///
    /// let samples = vec![10.0, 20.0, 30.0];
    /// let stats = LatencyStats::from_samples(&samples);
    /// assert_eq!(stats.min, 10.0);
    /// assert_eq!(stats.max, 30.0);
    /// assert_eq!(stats.avg, 20.0);
    /// assert_eq!(stats.count, 3);
    /// ```
    pub fn from_samples(samples: &[f64]) -> Self {
        let valid: Vec<f64> = samples
            .iter()
            .copied()
            .filter(|x| x.is_finite() && *x >= 0.0)
            .collect();

        if valid.is_empty() {
            return Self::default();
        }

        let count = valid.len();
        let sum: f64 = valid.iter().sum();
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            min,
            max,
            avg: sum / count as f64,
            count,
        }
    }

    /// Check if no valid samples were provided
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
