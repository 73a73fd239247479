//! Analytics model - progress events, snapshots and reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::content::ContentKind;
use crate::id::{CourseId, SkillId, StudentId};
use crate::learner::LearningStyle;
use crate::Time;

/// Progress reported for one learning interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    /// Demonstrated proficiency in [0, 1] (assessment score, exercise result)
    pub score: f64,

    /// Time spent
    pub time_spent_minutes: f64,

    /// Kind of content used, when known
    #[serde(default)]
    pub content_kind: Option<ContentKind>,

    /// Whether the learner finished the skill's checkpoint
    #[serde(default)]
    pub completed: bool,
}

impl ProgressData {
    /// Progress with only a score.
    pub fn scored(score: f64) -> Self {
        Self {
            score,
            time_spent_minutes: 0.0,
            content_kind: None,
            completed: false,
        }
    }
}

/// Point-in-time analytics for one learner in one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// The learner
    pub student: StudentId,

    /// Course context
    pub course: CourseId,

    /// Skill the learning rate refers to
    pub skill: Option<SkillId>,

    /// Skills in the course
    pub total_skills: usize,

    /// Fraction of course skills at/above the completion threshold
    pub completion_rate: f64,

    /// Mean mastery over course skills
    pub average_level: f64,

    /// Mastery gained per hour
    pub learning_rate: f64,

    /// Percentage of the cached pathway completed
    pub pathway_progress: f64,

    /// Detected patterns, filled on broadcast ticks
    pub patterns: Option<PatternReport>,

    /// Insights, filled on broadcast ticks
    pub insights: Vec<Insight>,

    /// When computed
    pub generated_at: Time,
}

/// Aggregate over students active in a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessReport {
    /// Course analysed
    pub course: CourseId,

    /// Mean hours from first activity on a skill to mastering it
    pub average_completion_hours: f64,

    /// Mean mastery across active students
    pub average_skill_level: f64,

    /// Mean completion rate across active students
    pub completion_rate: f64,

    /// Students with activity in the window
    pub student_count: usize,
}

/// Behavioural patterns of a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Mean hours between level gains
    pub average_hours_between_gains: Option<f64>,

    /// 1 for perfectly regular gains, towards 0 for erratic ones
    pub consistency: f64,

    /// Style inferred from the content that produced the most gain
    pub inferred_style: Option<LearningStyle>,

    /// Activity count per hour of day (UTC)
    pub active_hours: BTreeMap<u32, usize>,
}

impl PatternReport {
    /// Hours of day with the most activity, busiest first.
    pub fn preferred_hours(&self, limit: usize) -> Vec<u32> {
        let mut hours: Vec<_> = self.active_hours.iter().collect();
        hours.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        hours.into_iter().take(limit).map(|(h, _)| *h).collect()
    }
}

/// Kind of generated insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// No gain for a long time
    StalledProgress,
    /// Recent gains outpace earlier ones
    AcceleratingMastery,
    /// Gains come from a different content kind than the stated style prefers
    StyleMismatch,
    /// Irregular study rhythm
    LowConsistency,
    /// Most course skills completed
    NearCompletion,
}

/// A rule-based observation about a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Rule that fired
    pub kind: InsightKind,

    /// Human-readable message
    pub message: String,

    /// Values that triggered the rule
    pub data: serde_json::Value,
}

/// Messages pushed to analytics subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// A learner's mastery changed
    Progress {
        student: StudentId,
        course: CourseId,
        skill: SkillId,
        previous_level: f64,
        level: f64,
        at: Time,
    },
    /// Periodic snapshot
    Snapshot(AnalyticsSnapshot),
}
