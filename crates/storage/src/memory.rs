//! In-memory storage implementation.
//!
//! Keeps everything in process behind a single async `RwLock`. Used by tests
//! and by embedders that load their data from elsewhere at startup.

use async_trait::async_trait;
use skillpath_core::{
    ActivityRecord, Course, CourseId, LearnerProfile, LearningContent, MasteryRecord, Pathway,
    PrerequisiteEdge, Skill, SkillId, StudentId, Time,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::trait_::{ContentCatalog, MasteryKey, Result, Storage, StorageError};

#[derive(Default)]
struct Inner {
    skills: Vec<Skill>,
    edges: Vec<PrerequisiteEdge>,
    courses: HashMap<CourseId, Course>,
    profiles: HashMap<StudentId, LearnerProfile>,
    mastery: HashMap<MasteryKey, MasteryRecord>,
    activities: Vec<ActivityRecord>,
    pathways: HashMap<(StudentId, CourseId), Pathway>,
    content: HashMap<SkillId, Vec<LearningContent>>,
}

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_skill(&self, skill: &Skill) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.skills.iter_mut().find(|s| s.id == skill.id) {
            Some(existing) => *existing = skill.clone(),
            None => inner.skills.push(skill.clone()),
        }
        Ok(())
    }

    async fn load_skill(&self, id: &SkillId) -> Result<Option<Skill>> {
        let inner = self.inner.read().await;
        Ok(inner.skills.iter().find(|s| &s.id == id).cloned())
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        Ok(self.inner.read().await.skills.clone())
    }

    async fn save_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.edges.contains(edge) {
            inner.edges.push(edge.clone());
        }
        Ok(())
    }

    async fn delete_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        self.inner.write().await.edges.retain(|e| e != edge);
        Ok(())
    }

    async fn list_prerequisites(&self) -> Result<Vec<PrerequisiteEdge>> {
        Ok(self.inner.read().await.edges.clone())
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        self.inner
            .write()
            .await
            .courses
            .insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>> {
        Ok(self.inner.read().await.courses.get(id).cloned())
    }

    async fn list_courses_for_student(&self, student: &StudentId) -> Result<Vec<Course>> {
        let inner = self.inner.read().await;
        let mut courses: Vec<Course> = inner
            .courses
            .values()
            .filter(|c| c.students.contains(student))
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(courses)
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.student.clone(), profile.clone());
        Ok(())
    }

    async fn load_profile(&self, student: &StudentId) -> Result<Option<LearnerProfile>> {
        Ok(self.inner.read().await.profiles.get(student).cloned())
    }

    async fn load_mastery(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>> {
        Ok(self.inner.read().await.mastery.get(key).cloned())
    }

    async fn list_mastery(&self, student: &StudentId, course: &CourseId) -> Result<Vec<MasteryRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<MasteryRecord> = inner
            .mastery
            .values()
            .filter(|r| &r.student == student && &r.course == course)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.skill.cmp(&b.skill));
        Ok(records)
    }

    async fn compare_and_set_mastery(
        &self,
        key: &MasteryKey,
        expected_version: Option<u64>,
        level: f64,
        at: Time,
    ) -> Result<MasteryRecord> {
        let mut inner = self.inner.write().await;
        let found = inner.mastery.get(key).map(|r| r.version);
        if found != expected_version {
            return Err(StorageError::ConcurrentModification {
                key: key.to_string(),
                expected: expected_version,
                found,
            });
        }

        let record = MasteryRecord {
            student: key.student.clone(),
            course: key.course.clone(),
            skill: key.skill.clone(),
            level,
            version: found.map_or(1, |v| v + 1),
            updated_at: at,
        };
        inner.mastery.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn append_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.inner.write().await.activities.push(record.clone());
        Ok(())
    }

    async fn list_activities(&self, student: &StudentId, course: &CourseId) -> Result<Vec<ActivityRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ActivityRecord> = inner
            .activities
            .iter()
            .filter(|a| &a.student == student && &a.course == course)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.recorded_at);
        Ok(records)
    }

    async fn list_course_activities(&self, course: &CourseId, since: Time) -> Result<Vec<ActivityRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<ActivityRecord> = inner
            .activities
            .iter()
            .filter(|a| &a.course == course && a.recorded_at >= since)
            .cloned()
            .collect();
        records.sort_by_key(|a| a.recorded_at);
        Ok(records)
    }

    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        self.inner.write().await.pathways.insert(
            (pathway.student_id.clone(), pathway.course_id.clone()),
            pathway.clone(),
        );
        Ok(())
    }

    async fn load_pathway(&self, student: &StudentId, course: &CourseId) -> Result<Option<Pathway>> {
        let inner = self.inner.read().await;
        Ok(inner.pathways.get(&(student.clone(), course.clone())).cloned())
    }
}

#[async_trait]
impl ContentCatalog for MemoryStorage {
    async fn content_for(&self, skill: &SkillId) -> Result<Vec<LearningContent>> {
        Ok(self
            .inner
            .read()
            .await
            .content
            .get(skill)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_content(&self, skill: &SkillId, content: LearningContent) -> Result<()> {
        self.inner
            .write()
            .await
            .content
            .entry(skill.clone())
            .or_default()
            .push(content);
        Ok(())
    }
}
