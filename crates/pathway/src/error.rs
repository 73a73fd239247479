//! Pathway errors.

use skillpath_graph::GraphError;
use skillpath_storage::StorageError;

/// Error type for pathway operations.
pub type Result<T> = std::result::Result<T, PathwayError>;

/// Errors raised while generating or enhancing pathways.
#[derive(Debug, thiserror::Error)]
pub enum PathwayError {
    /// Difficulty is not beginner, intermediate or advanced
    #[error("invalid difficulty: '{0}'")]
    InvalidDifficulty(String),

    /// Learning style is not recognised
    #[error("invalid learning style: '{0}'")]
    InvalidLearningStyle(String),

    /// Graph lookup or traversal failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}
