//! Planner and analytics configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillpathConfig {
    /// Pathway generation
    pub pathway: PathwayConfig,

    /// Real-time analytics
    pub analytics: AnalyticsConfig,
}

impl SkillpathConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pathway.max_group_size == 0 {
            return Err(ConfigError::Invalid("pathway.max_group_size must be at least 1".into()));
        }
        if self.pathway.min_minutes == 0 {
            return Err(ConfigError::Invalid("pathway.min_minutes must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.analytics.completion_threshold) {
            return Err(ConfigError::Invalid(
                "analytics.completion_threshold must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analytics.level_update_weight) {
            return Err(ConfigError::Invalid(
                "analytics.level_update_weight must be within [0, 1]".into(),
            ));
        }
        if self.analytics.channel_capacity == 0 {
            return Err(ConfigError::Invalid("analytics.channel_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

/// Pathway generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwayConfig {
    /// Largest number of skills in one step
    pub max_group_size: usize,

    /// Lifetime of a cached pathway
    pub cache_ttl_secs: u64,

    /// Estimated minutes for a skill at zero mastery
    pub baseline_minutes: u32,

    /// Lower bound on any estimate
    pub min_minutes: u32,
}

impl Default for PathwayConfig {
    fn default() -> Self {
        Self {
            max_group_size: 4,
            cache_ttl_secs: 3600,
            baseline_minutes: 60,
            min_minutes: 10,
        }
    }
}

impl PathwayConfig {
    /// Set max group size.
    pub fn with_max_group_size(mut self, size: usize) -> Self {
        self.max_group_size = size;
        self
    }

    /// Set cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Set baseline and minimum estimate.
    pub fn with_estimates(mut self, baseline_minutes: u32, min_minutes: u32) -> Self {
        self.baseline_minutes = baseline_minutes;
        self.min_minutes = min_minutes;
        self
    }

    /// Cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Real-time analytics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Mastery at which a skill counts as completed
    pub completion_threshold: f64,

    /// Fraction of the gap to a higher score closed per update
    pub level_update_weight: f64,

    /// Compare-and-set attempts before giving up
    pub max_update_retries: u32,

    /// Initial backoff between attempts, doubled each retry
    pub retry_backoff_ms: u64,

    /// Default broadcast period
    pub broadcast_interval_secs: u64,

    /// No gain for this long counts as stalled
    pub stall_window_hours: i64,

    /// Buffered events per subscriber
    pub channel_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            completion_threshold: 0.75,
            level_update_weight: 0.5,
            max_update_retries: 3,
            retry_backoff_ms: 25,
            broadcast_interval_secs: 30,
            stall_window_hours: 168,
            channel_capacity: 256,
        }
    }
}

impl AnalyticsConfig {
    /// Set completion threshold.
    pub fn with_completion_threshold(mut self, threshold: f64) -> Self {
        self.completion_threshold = threshold;
        self
    }

    /// Set retry policy.
    pub fn with_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.max_update_retries = attempts;
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set broadcast period.
    pub fn with_broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval_secs = interval.as_secs();
        self
    }

    /// Default broadcast period as a duration.
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs)
    }

    /// Initial retry backoff as a duration.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
