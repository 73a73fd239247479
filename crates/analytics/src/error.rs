//! Analytics errors.

use skillpath_graph::GraphError;
use skillpath_storage::StorageError;

/// Error type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors raised by [`crate::RealTimeAnalytics`].
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Skill lookup failure
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Mastery kept changing underneath every attempt
    #[error("mastery {key} still contended after {attempts} attempts")]
    ConcurrentModification {
        /// Contended mastery key
        key: String,
        /// Attempts made
        attempts: u32,
    },

    /// Score or time out of range
    #[error("invalid progress: {0}")]
    InvalidProgress(String),
}
