//! Storage trait abstraction.

use async_trait::async_trait;
use skillpath_core::{
    ActivityRecord, Course, CourseId, LearnerProfile, LearnerState, LearningContent,
    MasteryRecord, Pathway, PrerequisiteEdge, Skill, SkillId, StudentId, Time,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored version moved on since it was read
    #[error("Concurrent modification of {key}: expected version {expected:?}, found {found:?}")]
    ConcurrentModification {
        /// Record key
        key: String,
        /// Version the writer read
        expected: Option<u64>,
        /// Version currently stored
        found: Option<u64>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::ConcurrentModification { .. })
    }
}

/// Key of a stored mastery level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MasteryKey {
    /// The learner
    pub student: StudentId,
    /// Course context
    pub course: CourseId,
    /// The skill
    pub skill: SkillId,
}

impl MasteryKey {
    /// Create a key.
    pub fn new(student: StudentId, course: CourseId, skill: SkillId) -> Self {
        Self { student, course, skill }
    }
}

impl std::fmt::Display for MasteryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.student, self.course, self.skill)
    }
}

/// Number of activity records included in a [`LearnerState`].
pub const RECENT_ACTIVITY_LIMIT: usize = 50;

/// Persistence collaborator for Skillpath data.
///
/// This trait allows different storage backends to be plugged in. All
/// methods take `&self`; implementations provide their own interior locking.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Skill operations ===

    /// Save a skill (create or update, keeping its original position).
    async fn save_skill(&self, skill: &Skill) -> Result<()>;

    /// Load a skill by ID.
    async fn load_skill(&self, id: &SkillId) -> Result<Option<Skill>>;

    /// List skills in first-insertion order.
    async fn list_skills(&self) -> Result<Vec<Skill>>;

    // === Prerequisite operations ===

    /// Save an edge if not already stored.
    async fn save_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()>;

    /// Delete an edge.
    async fn delete_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()>;

    /// List edges in insertion order.
    async fn list_prerequisites(&self) -> Result<Vec<PrerequisiteEdge>>;

    // === Course operations ===

    /// Save a course (create or update).
    async fn save_course(&self, course: &Course) -> Result<()>;

    /// Load a course by ID.
    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>>;

    /// Courses a student is enrolled in.
    async fn list_courses_for_student(&self, student: &StudentId) -> Result<Vec<Course>>;

    // === Learner operations ===

    /// Save a learner profile.
    async fn save_profile(&self, profile: &LearnerProfile) -> Result<()>;

    /// Load a learner profile.
    async fn load_profile(&self, student: &StudentId) -> Result<Option<LearnerProfile>>;

    /// Load one mastery record.
    async fn load_mastery(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>>;

    /// All mastery records of a student in a course.
    async fn list_mastery(&self, student: &StudentId, course: &CourseId) -> Result<Vec<MasteryRecord>>;

    /// Write `level` only if the stored version still equals `expected_version`
    /// (`None` meaning "no record yet"). Fails with
    /// [`StorageError::ConcurrentModification`] otherwise.
    async fn compare_and_set_mastery(
        &self,
        key: &MasteryKey,
        expected_version: Option<u64>,
        level: f64,
        at: Time,
    ) -> Result<MasteryRecord>;

    // === Activity operations ===

    /// Append an activity record.
    async fn append_activity(&self, record: &ActivityRecord) -> Result<()>;

    /// Activity of a student in a course, oldest first.
    async fn list_activities(&self, student: &StudentId, course: &CourseId) -> Result<Vec<ActivityRecord>>;

    /// Activity of all students in a course recorded at or after `since`, oldest first.
    async fn list_course_activities(&self, course: &CourseId, since: Time) -> Result<Vec<ActivityRecord>>;

    // === Pathway operations ===

    /// Save the latest pathway of a student in a course.
    async fn save_pathway(&self, pathway: &Pathway) -> Result<()>;

    /// Load the latest pathway of a student in a course.
    async fn load_pathway(&self, student: &StudentId, course: &CourseId) -> Result<Option<Pathway>>;

    // === Composite reads ===

    /// Assemble the planner's view of a learner.
    async fn load_learner_state(&self, student: &StudentId, course: &CourseId) -> Result<LearnerState> {
        let mut state = LearnerState::new(student.clone(), course.clone());

        if let Some(profile) = self.load_profile(student).await? {
            state.learning_style = profile.learning_style;
            state.difficulty = profile.difficulty;
        }

        for record in self.list_mastery(student, course).await? {
            state.mastery.insert(record.skill, record.level);
        }

        let mut activity = self.list_activities(student, course).await?;
        let skip = activity.len().saturating_sub(RECENT_ACTIVITY_LIMIT);
        state.recent_activity = activity.split_off(skip);

        Ok(state)
    }
}

/// Catalog of raw learning content per skill.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Content items for a skill, in catalog order.
    async fn content_for(&self, skill: &SkillId) -> Result<Vec<LearningContent>>;

    /// Append a content item to a skill.
    async fn add_content(&self, skill: &SkillId, content: LearningContent) -> Result<()>;
}
