//! JSON file storage implementation.
//!
//! Stores data as JSON files under a root directory. Ordered collections
//! (skills, prerequisite edges) live in single files so their insertion order
//! survives a restart; per-learner data is split into one file per
//! (student, course) pair.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use skillpath_core::{
    ActivityRecord, Course, CourseId, LearnerProfile, LearningContent, MasteryRecord, Pathway,
    PrerequisiteEdge, Skill, SkillId, StudentId, Time,
};
use std::collections::HashMap;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::trait_::{ContentCatalog, MasteryKey, Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    /// Serializes read-modify-write cycles on shared files.
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the subdirectories it needs.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("courses")).await?;
        fs::create_dir_all(root.join("profiles")).await?;
        fs::create_dir_all(root.join("mastery")).await?;
        fs::create_dir_all(root.join("activities")).await?;
        fs::create_dir_all(root.join("pathways")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn skills_path(&self) -> PathBuf {
        self.root.join("skills.json")
    }
    fn prerequisites_path(&self) -> PathBuf {
        self.root.join("prerequisites.json")
    }
    fn content_path(&self) -> PathBuf {
        self.root.join("content.json")
    }
    fn course_path(&self, id: &CourseId) -> PathBuf {
        self.root.join("courses").join(format!("{}.json", file_stem(id.as_str())))
    }
    fn profile_path(&self, id: &StudentId) -> PathBuf {
        self.root.join("profiles").join(format!("{}.json", file_stem(id.as_str())))
    }
    fn learner_path(&self, kind: &str, student: &StudentId, course: &CourseId) -> PathBuf {
        self.root.join(kind).join(format!(
            "{}__{}.json",
            file_stem(student.as_str()),
            file_stem(course.as_str())
        ))
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn save_skill(&self, skill: &Skill) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.skills_path();
        let mut skills: Vec<Skill> = read_json(&path).await?.unwrap_or_default();
        match skills.iter_mut().find(|s| s.id == skill.id) {
            Some(existing) => *existing = skill.clone(),
            None => skills.push(skill.clone()),
        }
        write_json(&path, &skills).await
    }

    async fn load_skill(&self, id: &SkillId) -> Result<Option<Skill>> {
        let skills: Vec<Skill> = read_json(&self.skills_path()).await?.unwrap_or_default();
        Ok(skills.into_iter().find(|s| &s.id == id))
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        Ok(read_json(&self.skills_path()).await?.unwrap_or_default())
    }

    async fn save_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.prerequisites_path();
        let mut edges: Vec<PrerequisiteEdge> = read_json(&path).await?.unwrap_or_default();
        if edges.contains(edge) {
            return Ok(());
        }
        edges.push(edge.clone());
        write_json(&path, &edges).await
    }

    async fn delete_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.prerequisites_path();
        let mut edges: Vec<PrerequisiteEdge> = read_json(&path).await?.unwrap_or_default();
        edges.retain(|e| e != edge);
        write_json(&path, &edges).await
    }

    async fn list_prerequisites(&self) -> Result<Vec<PrerequisiteEdge>> {
        Ok(read_json(&self.prerequisites_path()).await?.unwrap_or_default())
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.course_path(&course.id), course).await
    }

    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>> {
        read_json(&self.course_path(id)).await
    }

    async fn list_courses_for_student(&self, student: &StudentId) -> Result<Vec<Course>> {
        let all: Vec<Course> = list_dir(&self.root.join("courses")).await?;
        let mut courses: Vec<Course> = all
            .into_iter()
            .filter(|c| c.students.contains(student))
            .collect();
        courses.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(courses)
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(&self.profile_path(&profile.student), profile).await
    }

    async fn load_profile(&self, student: &StudentId) -> Result<Option<LearnerProfile>> {
        read_json(&self.profile_path(student)).await
    }

    async fn load_mastery(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>> {
        let records = self.list_mastery(&key.student, &key.course).await?;
        Ok(records.into_iter().find(|r| r.skill == key.skill))
    }

    async fn list_mastery(&self, student: &StudentId, course: &CourseId) -> Result<Vec<MasteryRecord>> {
        let path = self.learner_path("mastery", student, course);
        Ok(read_json(&path).await?.unwrap_or_default())
    }

    async fn compare_and_set_mastery(
        &self,
        key: &MasteryKey,
        expected_version: Option<u64>,
        level: f64,
        at: Time,
    ) -> Result<MasteryRecord> {
        let _guard = self.write_lock.lock().await;
        let path = self.learner_path("mastery", &key.student, &key.course);
        let mut records: Vec<MasteryRecord> = read_json(&path).await?.unwrap_or_default();

        let position = records.iter().position(|r| r.skill == key.skill);
        let found = position.map(|i| records[i].version);
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
        match position {
            Some(i) => records[i] = record.clone(),
            None => records.push(record.clone()),
        }
        write_json(&path, &records).await?;
        debug!("Stored mastery {} = {:.3} (v{})", key, level, record.version);
        Ok(record)
    }

    async fn append_activity(&self, record: &ActivityRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.learner_path("activities", &record.student, &record.course);
        let mut records: Vec<ActivityRecord> = read_json(&path).await?.unwrap_or_default();
        records.push(record.clone());
        write_json(&path, &records).await
    }

    async fn list_activities(&self, student: &StudentId, course: &CourseId) -> Result<Vec<ActivityRecord>> {
        let path = self.learner_path("activities", student, course);
        let mut records: Vec<ActivityRecord> = read_json(&path).await?.unwrap_or_default();
        records.sort_by_key(|a| a.recorded_at);
        Ok(records)
    }

    async fn list_course_activities(&self, course: &CourseId, since: Time) -> Result<Vec<ActivityRecord>> {
        let files: Vec<Vec<ActivityRecord>> = list_dir(&self.root.join("activities")).await?;
        let mut records: Vec<ActivityRecord> = files
            .into_iter()
            .flatten()
            .filter(|a| &a.course == course && a.recorded_at >= since)
            .collect();
        records.sort_by_key(|a| a.recorded_at);
        Ok(records)
    }

    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.learner_path("pathways", &pathway.student_id, &pathway.course_id);
        write_json(&path, pathway).await
    }

    async fn load_pathway(&self, student: &StudentId, course: &CourseId) -> Result<Option<Pathway>> {
        read_json(&self.learner_path("pathways", student, course)).await
    }
}

#[async_trait]
impl ContentCatalog for JsonStorage {
    async fn content_for(&self, skill: &SkillId) -> Result<Vec<LearningContent>> {
        let mut catalog: HashMap<SkillId, Vec<LearningContent>> =
            read_json(&self.content_path()).await?.unwrap_or_default();
        Ok(catalog.remove(skill).unwrap_or_default())
    }

    async fn add_content(&self, skill: &SkillId, content: LearningContent) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.content_path();
        let mut catalog: HashMap<SkillId, Vec<LearningContent>> =
            read_json(&path).await?.unwrap_or_default();
        catalog.entry(skill.clone()).or_default().push(content);
        write_json(&path, &catalog).await
    }
}

/// Encode an id as a file name. ASCII letters, digits and `-` pass
/// through; every other byte becomes `_XX`. `_` only ever starts an
/// escape, so distinct ids never share a file and `__` cannot occur
/// inside a stem.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

async fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    // Readers do not take the write lock; rename keeps them from seeing half a file.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_core::{Difficulty, LearningStyle};

    #[tokio::test]
    async fn test_skills_and_edges_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = JsonStorage::new(dir.path()).await.unwrap();
            storage.save_skill(&Skill::new("b", "B", 1, "cat")).await.unwrap();
            storage.save_skill(&Skill::new("a", "A", 0, "cat")).await.unwrap();
            storage.save_prerequisite(&PrerequisiteEdge::new("b", "a")).await.unwrap();
            storage.save_prerequisite(&PrerequisiteEdge::new("b", "a")).await.unwrap();
        }

        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let skills = storage.list_skills().await.unwrap();
        assert_eq!(skills.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(storage.list_prerequisites().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mastery_compare_and_set_rejects_stale_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let key = MasteryKey::new(StudentId::from("s/1"), CourseId::from("c1"), SkillId::from("a"));
        let now = chrono::Utc::now();

        storage.compare_and_set_mastery(&key, None, 0.2, now).await.unwrap();
        let err = storage.compare_and_set_mastery(&key, None, 0.4, now).await.unwrap_err();
        assert!(err.is_transient());

        let updated = storage.compare_and_set_mastery(&key, Some(1), 0.4, now).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(storage.load_mastery(&key).await.unwrap().unwrap().level, 0.4);
    }

    #[test]
    fn test_file_stem_is_injective() {
        assert_eq!(file_stem("s-1"), "s-1");
        assert_eq!(file_stem("s/1"), "s_2F1");
        assert_eq!(file_stem("s_1"), "s_5F1");
        assert_eq!(file_stem("é"), "_C3_A9");
        assert_ne!(file_stem("a_2F"), file_stem("a/"));
    }

    #[tokio::test]
    async fn test_similar_ids_keep_separate_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let course = CourseId::from("c1");
        let slash = MasteryKey::new(StudentId::from("s/1"), course.clone(), SkillId::from("a"));
        let underscore = MasteryKey::new(StudentId::from("s_1"), course.clone(), SkillId::from("a"));
        let now = chrono::Utc::now();

        storage.compare_and_set_mastery(&slash, None, 0.2, now).await.unwrap();
        // A fresh key for the other student, not a stale write
        let other = storage.compare_and_set_mastery(&underscore, None, 0.7, now).await.unwrap();
        assert_eq!(other.version, 1);

        assert_eq!(storage.load_mastery(&slash).await.unwrap().unwrap().level, 0.2);
        assert_eq!(storage.load_mastery(&underscore).await.unwrap().unwrap().level, 0.7);
        assert_eq!(storage.list_mastery(&StudentId::from("s/1"), &course).await.unwrap().len(), 1);
        assert_eq!(storage.list_mastery(&StudentId::from("s_1"), &course).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_courses_profiles_and_activity() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut course = Course::new("c1", "Course");
        course.add_skill(SkillId::from("a"));
        course.enroll(StudentId::from("s1"));
        storage.save_course(&course).await.unwrap();
        storage
            .save_profile(&LearnerProfile::new("s1", LearningStyle::Sequential, Difficulty::Beginner))
            .await
            .unwrap();

        let now = chrono::Utc::now();
        storage
            .append_activity(&ActivityRecord {
                id: skillpath_core::ActivityId::new(),
                student: StudentId::from("s1"),
                course: CourseId::from("c1"),
                skill: SkillId::from("a"),
                level_before: 0.0,
                level_after: 0.3,
                content_kind: None,
                time_spent_minutes: 15.0,
                recorded_at: now,
            })
            .await
            .unwrap();

        let courses = storage.list_courses_for_student(&StudentId::from("s1")).await.unwrap();
        assert_eq!(courses.len(), 1);

        let recent = storage
            .list_course_activities(&CourseId::from("c1"), now - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let state = storage
            .load_learner_state(&StudentId::from("s1"), &CourseId::from("c1"))
            .await
            .unwrap();
        assert_eq!(state.learning_style, LearningStyle::Sequential);
        assert_eq!(state.recent_activity.len(), 1);
    }

    #[tokio::test]
    async fn test_content_catalog_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let skill = SkillId::from("a");
        storage
            .add_content(
                &skill,
                LearningContent::Video { title: "Intro".into(), url: "https://v/1".into(), duration_minutes: 8 },
            )
            .await
            .unwrap();

        let items = storage.content_for(&skill).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title(), "Intro");
    }
}
