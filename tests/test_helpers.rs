//! Test helpers for timing-sensitive tests
//!
//! Transfer durations depend on scheduler and loopback load, so timing
//! assertions use medians and CI-aware tolerances.

use std::time::Duration;

/// Median-based timing validator
pub struct TimingValidator {
    samples: Vec<Duration>,
    ci_tolerance_multiplier: f64,
}

impl TimingValidator {
    /// Create a validator expecting about `sample_count` samples
    pub fn new(sample_count: usize) -> Self {
        let ci_tolerance_multiplier = if is_ci_environment() { 3.0 } else { 1.5 };

        Self {
            samples: Vec::with_capacity(sample_count),
            ci_tolerance_multiplier,
        }
    }

    /// Add a timing sample
    pub fn add_sample(&mut self, duration: Duration) {
        self.samples.push(duration);
    }

    /// Median of all samples
    pub fn median(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort();

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2)
        } else {
            Some(sorted[mid])
        }
    }

    /// Assert that the median is within `tolerance_ratio` of `expected`,
    /// widened for CI
    ///
    /// # Panics
    ///
    /// Panics if no samples have been added or if the median is outside tolerance.
    pub fn assert_within_tolerance(&self, expected: Duration, tolerance_ratio: f64) {
        let median = self.median().expect("No samples collected");
        let adjusted_tolerance = tolerance_ratio * self.ci_tolerance_multiplier;

        let lower_bound = expected.mul_f64((1.0 - adjusted_tolerance).max(0.0));
        let upper_bound = expected.mul_f64(1.0 + adjusted_tolerance);

        assert!(
            median >= lower_bound && median <= upper_bound,
            "Median timing {:?} outside tolerance range [{:?}, {:?}] (expected: {:?}, CI-adjusted tolerance: {:.1}%)",
            median,
            lower_bound,
            upper_bound,
            expected,
            adjusted_tolerance * 100.0
        );
    }
}

/// Check if running in a CI environment
pub fn is_ci_environment() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
}

/// CI-adjusted timeout: 3x the base in CI, 1.5x locally
pub fn ci_timeout(base_timeout: Duration) -> Duration {
    if is_ci_environment() {
        base_timeout.mul_f32(3.0)
    } else {
        base_timeout.mul_f32(1.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_validator_median() {
        let mut validator = TimingValidator::new(4);
        validator.add_sample(Duration::from_millis(100));
        validator.add_sample(Duration::from_millis(300));
        validator.add_sample(Duration::from_millis(200));
        validator.add_sample(Duration::from_millis(400));

        assert_eq!(validator.median(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_ci_timeout_never_shrinks() {
        let base = Duration::from_secs(2);
        assert!(ci_timeout(base) > base);
    }

    #[test]
    fn test_empty_validator_has_no_median() {
        assert!(TimingValidator::new(3).median().is_none());
    }
}
