//! Pathway model - ordered, bounded learning steps.

use serde::{Deserialize, Serialize};
use crate::content::AdaptedContent;
use crate::id::{CourseId, PathwayId, SkillId, StudentId};
use crate::learner::{Difficulty, LearningStyle};
use crate::skill::Skill;
use crate::Time;

/// A generated learning pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    /// Unique identifier
    pub id: PathwayId,

    /// The learner
    pub student_id: StudentId,

    /// Course context
    pub course_id: CourseId,

    /// Ordered steps
    pub steps: Vec<PathwayStep>,

    /// Generation parameters and totals
    pub metadata: PathwayMetadata,

    /// When generated
    pub created_at: Time,
}

impl Pathway {
    /// Whether the pathway has no skills at all.
    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(|s| s.skills.is_empty())
    }

    /// All planned skills in order.
    pub fn planned_skills(&self) -> impl Iterator<Item = &PlannedSkill> {
        self.steps.iter().flat_map(|s| s.skills.iter())
    }

    /// All skill ids in order.
    pub fn skill_ids(&self) -> Vec<SkillId> {
        self.planned_skills().map(|p| p.skill.id.clone()).collect()
    }

    /// Skill ids grouped by step.
    pub fn groups(&self) -> Vec<Vec<SkillId>> {
        self.steps
            .iter()
            .map(|s| s.skills.iter().map(|p| p.skill.id.clone()).collect())
            .collect()
    }

    /// Rebuild steps from groups and refresh the total estimate.
    pub fn set_groups(&mut self, groups: Vec<Vec<PlannedSkill>>) {
        self.steps = groups
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(PathwayStep::new)
            .collect();
        self.metadata.estimated_total_minutes = self
            .planned_skills()
            .map(|p| p.estimated_minutes)
            .sum();
    }
}

/// One bounded group of skills learned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayStep {
    /// Skills in learning order
    pub skills: Vec<PlannedSkill>,
}

impl PathwayStep {
    /// Create a step.
    pub fn new(skills: Vec<PlannedSkill>) -> Self {
        Self { skills }
    }

    /// Estimated minutes for the whole step.
    pub fn estimated_minutes(&self) -> u32 {
        self.skills.iter().map(|s| s.estimated_minutes).sum()
    }
}

/// A skill with everything the learner needs to work on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSkill {
    /// The skill
    pub skill: Skill,

    /// Ordered, adapted content
    pub content: Vec<AdaptedContent>,

    /// Estimated learning time
    pub estimated_minutes: u32,

    /// Assessment gate
    pub checkpoint: Checkpoint,
}

/// Kind of assessment at a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    /// Short quiz
    Quiz,
    /// Graded assessment
    Assessment,
    /// Open-ended project
    Project,
}

impl CheckpointKind {
    /// Assessment used for a difficulty.
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Beginner => CheckpointKind::Quiz,
            Difficulty::Intermediate => CheckpointKind::Assessment,
            Difficulty::Advanced => CheckpointKind::Project,
        }
    }
}

/// Assessment gate attached to a planned skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Assessment kind
    pub kind: CheckpointKind,

    /// Display title
    pub title: String,

    /// Mastery needed to pass
    pub pass_threshold: f64,
}

/// Parameters a pathway was generated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayMetadata {
    /// Requested difficulty
    pub difficulty: Difficulty,

    /// Requested learning style
    pub learning_style: LearningStyle,

    /// Sum of per-skill estimates
    pub estimated_total_minutes: u32,
}

/// Single-step recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStep {
    /// Recommended skill
    pub skill: Skill,

    /// Estimated learning time
    pub estimated_minutes: u32,
}
