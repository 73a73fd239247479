//! Learning time estimation.

use skillpath_core::PathwayConfig;

/// Learning time estimator.
///
/// Time shrinks linearly with mastery and never drops below the floor.
#[derive(Debug, Clone, Copy)]
pub struct TimeEstimator {
    baseline_minutes: u32,
    min_minutes: u32,
}

impl TimeEstimator {
    /// Create an estimator from explicit bounds.
    pub fn new(baseline_minutes: u32, min_minutes: u32) -> Self {
        Self { baseline_minutes, min_minutes }
    }

    /// Create an estimator from pathway settings.
    pub fn from_config(config: &PathwayConfig) -> Self {
        Self::new(config.baseline_minutes, config.min_minutes)
    }

    /// Estimated minutes for a skill at the given mastery.
    pub fn estimate(&self, mastery: f64) -> u32 {
        let remaining = 1.0 - mastery.clamp(0.0, 1.0);
        let minutes = (self.baseline_minutes as f64 * remaining).round() as u32;
        minutes.max(self.min_minutes)
    }
}

impl Default for TimeEstimator {
    fn default() -> Self {
        Self::from_config(&PathwayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_shrinks_with_mastery() {
        let estimator = TimeEstimator::new(60, 10);
        assert_eq!(estimator.estimate(0.0), 60);
        assert_eq!(estimator.estimate(0.5), 30);
        assert!(estimator.estimate(0.6) <= estimator.estimate(0.4));
    }

    #[test]
    fn test_estimate_respects_floor() {
        let estimator = TimeEstimator::new(60, 10);
        assert_eq!(estimator.estimate(0.95), 10);
        assert_eq!(estimator.estimate(1.0), 10);
        // Out-of-range mastery is clamped
        assert_eq!(estimator.estimate(-1.0), 60);
    }
}
