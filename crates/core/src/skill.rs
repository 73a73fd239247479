//! Skill model - the nodes of the prerequisite graph.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::id::{CourseId, SkillId, StudentId};

/// An atomic unit of learnable competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Unique identifier
    pub id: SkillId,

    /// Display name
    pub name: String,

    /// Ordinal difficulty rank; prerequisites never outrank their dependents
    pub level: u32,

    /// Category (e.g. "programming", "mathematics")
    pub category: String,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Skill {
    /// Create a new skill without metadata.
    pub fn new(
        id: impl Into<SkillId>,
        name: impl Into<String>,
        level: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            level,
            category: category.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A directed dependency: `skill` requires `prerequisite`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    /// The dependent skill
    pub skill: SkillId,

    /// The skill that must be mastered first
    pub prerequisite: SkillId,
}

impl PrerequisiteEdge {
    /// Create a new edge.
    pub fn new(skill: impl Into<SkillId>, prerequisite: impl Into<SkillId>) -> Self {
        Self {
            skill: skill.into(),
            prerequisite: prerequisite.into(),
        }
    }
}

/// A course groups the skills on offer and the students enrolled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique identifier
    pub id: CourseId,

    /// Course name
    pub name: String,

    /// Skills taught in this course
    pub skills: Vec<SkillId>,

    /// Enrolled students
    pub students: Vec<StudentId>,
}

impl Course {
    /// Create an empty course.
    pub fn new(id: impl Into<CourseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            skills: Vec::new(),
            students: Vec::new(),
        }
    }

    /// Add a skill if not already present.
    pub fn add_skill(&mut self, skill: SkillId) {
        if !self.skills.contains(&skill) {
            self.skills.push(skill);
        }
    }

    /// Enroll a student if not already enrolled.
    pub fn enroll(&mut self, student: StudentId) {
        if !self.students.contains(&student) {
            self.students.push(student);
        }
    }
}
