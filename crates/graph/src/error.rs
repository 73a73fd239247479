//! Graph errors.

use skillpath_core::SkillId;
use skillpath_storage::StorageError;

/// Error type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised by [`crate::SkillGraph`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Lookup miss
    #[error("skill not found: {0}")]
    SkillNotFound(SkillId),

    /// Edge would close a cycle; graph unchanged
    #[error("adding prerequisite {prerequisite} to {skill} would create a cycle")]
    CycleDetected {
        /// Dependent skill
        skill: SkillId,
        /// Rejected prerequisite
        prerequisite: SkillId,
    },

    /// Prerequisite would outrank its dependent; graph unchanged
    #[error("prerequisite {prerequisite} (level {prerequisite_level}) outranks {skill} (level {skill_level})")]
    LevelOrderViolation {
        /// Dependent skill
        skill: SkillId,
        /// Its level
        skill_level: u32,
        /// Offending prerequisite
        prerequisite: SkillId,
        /// Its level
        prerequisite_level: u32,
    },

    /// No path between two skills
    #[error("no path from {from} to {to}")]
    NotReachable {
        /// Start skill
        from: SkillId,
        /// Target skill
        to: SkillId,
    },

    /// Persistence failure while loading or saving the graph
    #[error(transparent)]
    Storage(#[from] StorageError),
}
