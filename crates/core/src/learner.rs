//! Learner model - preferences, mastery and activity history.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use crate::content::ContentKind;
use crate::id::{ActivityId, CourseId, SkillId, StudentId};
use crate::Time;

/// Error returned when a preference string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseError {
    /// What was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

/// How a learner prefers to consume material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    /// Prefers video
    Visual,
    /// Prefers audio
    Auditory,
    /// Prefers text
    Reading,
    /// Prefers hands-on exercises
    Kinesthetic,
    /// Prefers one skill at a time, in level order
    Sequential,
}

impl LearningStyle {
    /// Content kind this style puts first, if any.
    pub fn preferred_content(self) -> Option<ContentKind> {
        match self {
            LearningStyle::Visual => Some(ContentKind::Video),
            LearningStyle::Auditory => Some(ContentKind::Audio),
            LearningStyle::Reading => Some(ContentKind::Text),
            LearningStyle::Kinesthetic => Some(ContentKind::Exercise),
            LearningStyle::Sequential => None,
        }
    }

    /// Style whose preferred content kind is `kind`.
    pub fn for_content(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Video => LearningStyle::Visual,
            ContentKind::Audio => LearningStyle::Auditory,
            ContentKind::Text => LearningStyle::Reading,
            ContentKind::Exercise => LearningStyle::Kinesthetic,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Reading => "reading",
            LearningStyle::Kinesthetic => "kinesthetic",
            LearningStyle::Sequential => "sequential",
        }
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningStyle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visual" => Ok(LearningStyle::Visual),
            "auditory" => Ok(LearningStyle::Auditory),
            "reading" => Ok(LearningStyle::Reading),
            "kinesthetic" => Ok(LearningStyle::Kinesthetic),
            "sequential" => Ok(LearningStyle::Sequential),
            _ => Err(ParseError {
                kind: "learning style",
                value: s.to_string(),
            }),
        }
    }
}

/// Difficulty preference for a pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Scaffolded content, lowest pass bar
    Beginner,
    /// Unmodified baseline
    Intermediate,
    /// Supplementary challenges, highest pass bar
    Advanced,
}

impl Difficulty {
    /// Mastery above which a skill counts as already learned.
    pub fn mastery_threshold(self) -> f64 {
        match self {
            Difficulty::Beginner => 0.60,
            Difficulty::Intermediate => 0.75,
            Difficulty::Advanced => 0.85,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ParseError {
                kind: "difficulty",
                value: s.to_string(),
            }),
        }
    }
}

/// Stored learner preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    /// The learner
    pub student: StudentId,

    /// Preferred learning style
    pub learning_style: LearningStyle,

    /// Preferred difficulty
    pub difficulty: Difficulty,
}

impl LearnerProfile {
    /// Create a profile.
    pub fn new(student: impl Into<StudentId>, learning_style: LearningStyle, difficulty: Difficulty) -> Self {
        Self {
            student: student.into(),
            learning_style,
            difficulty,
        }
    }
}

/// Stored mastery of one skill, versioned for compare-and-set updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryRecord {
    /// The learner
    pub student: StudentId,

    /// Course context
    pub course: CourseId,

    /// The skill
    pub skill: SkillId,

    /// Mastery in [0, 1]
    pub level: f64,

    /// Incremented on every successful write
    pub version: u64,

    /// Last write
    pub updated_at: Time,
}

/// One recorded learning interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unique identifier
    pub id: ActivityId,

    /// The learner
    pub student: StudentId,

    /// Course context
    pub course: CourseId,

    /// Skill practised
    pub skill: SkillId,

    /// Mastery before the interaction
    pub level_before: f64,

    /// Mastery after the interaction
    pub level_after: f64,

    /// Kind of content used, when known
    pub content_kind: Option<ContentKind>,

    /// Time spent
    pub time_spent_minutes: f64,

    /// When it happened
    pub recorded_at: Time,
}

impl ActivityRecord {
    /// Level gained during this interaction (never negative).
    pub fn gain(&self) -> f64 {
        (self.level_after - self.level_before).max(0.0)
    }
}

/// Per-student, per-course snapshot consumed by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerState {
    /// The learner
    pub student: StudentId,

    /// Course context
    pub course: CourseId,

    /// Skill -> mastery in [0, 1]
    pub mastery: HashMap<SkillId, f64>,

    /// Preferred learning style
    pub learning_style: LearningStyle,

    /// Preferred difficulty
    pub difficulty: Difficulty,

    /// Most recent activity, oldest first
    pub recent_activity: Vec<ActivityRecord>,
}

impl LearnerState {
    /// Empty state with default preferences.
    pub fn new(student: StudentId, course: CourseId) -> Self {
        Self {
            student,
            course,
            mastery: HashMap::new(),
            learning_style: LearningStyle::Reading,
            difficulty: Difficulty::Intermediate,
            recent_activity: Vec::new(),
        }
    }

    /// Mastery of a skill, zero when never practised.
    pub fn mastery_of(&self, skill: &SkillId) -> f64 {
        self.mastery.get(skill).copied().unwrap_or(0.0)
    }
}
