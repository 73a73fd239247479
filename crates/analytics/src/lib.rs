//! Skillpath real-time analytics.
//!
//! Tracks learner progress with conflict-safe mastery writes, derives
//! progress metrics, patterns and insights, and pushes them to subscribers
//! on a cancellable schedule.

#![warn(missing_docs)]

pub mod broadcast;
pub mod error;
pub mod hub;
pub mod insights;
pub mod metrics;
pub mod patterns;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use broadcast::BroadcastHandle;
pub use error::{AnalyticsError, Result};
pub use hub::{AnalyticsPublisher, BroadcastHub};
pub use insights::{derive_insights, InsightContext};
pub use patterns::detect_patterns;
pub use tracker::{next_level, RealTimeAnalytics};
