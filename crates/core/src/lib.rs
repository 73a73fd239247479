//! Skillpath core data models.
//!
//! This crate defines the data structures shared by the skill graph, the
//! pathway planner and the real-time analytics loop.

#![warn(missing_docs)]

// Core identities
mod id;

// Skills and learners
mod skill;
mod learner;
mod content;

// Planner output
mod pathway;
mod analytics;

// Ambient services
mod clock;
mod config;

// Re-exports
pub use id::*;

// Skills & learners
pub use skill::{Skill, PrerequisiteEdge, Course};
pub use learner::{
    LearningStyle, Difficulty, LearnerProfile, LearnerState, MasteryRecord, ActivityRecord,
    ParseError,
};
pub use content::{ContentKind, LearningContent, Adaptation, AdaptedContent};

// Pathways & analytics
pub use pathway::{
    Pathway, PathwayStep, PlannedSkill, Checkpoint, CheckpointKind, PathwayMetadata, NextStep,
};
pub use analytics::{
    ProgressData, AnalyticsSnapshot, EffectivenessReport, PatternReport, Insight, InsightKind,
    AnalyticsEvent,
};

// Services
pub use clock::{Clock, SystemClock, ManualClock};
pub use config::{SkillpathConfig, PathwayConfig, AnalyticsConfig, ConfigError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
