//! Test harness shared by the analytics modules.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use skillpath_core::{
    ActivityRecord, AnalyticsConfig, ContentKind, Course, CourseId, Difficulty, LearnerProfile,
    LearningContent, LearningStyle, ManualClock, MasteryRecord, Pathway, PathwayId, PathwayMetadata,
    PrerequisiteEdge, ProgressData, Skill, SkillId, StudentId, Time,
};
use skillpath_graph::SkillGraph;
use skillpath_pathway::PathwayCache;
use skillpath_storage::{MasteryKey, MemoryStorage, Result, Storage};

use crate::hub::BroadcastHub;
use crate::tracker::RealTimeAnalytics;

/// Memory storage whose mastery writes can be made to lose races.
#[derive(Default)]
pub(crate) struct ContendedStorage {
    inner: MemoryStorage,
    conflicts: AtomicU32,
}

impl ContendedStorage {
    /// Let a competing writer win the next `n` compare-and-set calls.
    pub fn inject_conflicts(&self, n: u32) {
        self.conflicts.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for ContendedStorage {
    async fn save_skill(&self, skill: &Skill) -> Result<()> {
        self.inner.save_skill(skill).await
    }

    async fn load_skill(&self, id: &SkillId) -> Result<Option<Skill>> {
        self.inner.load_skill(id).await
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        self.inner.list_skills().await
    }

    async fn save_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        self.inner.save_prerequisite(edge).await
    }

    async fn delete_prerequisite(&self, edge: &PrerequisiteEdge) -> Result<()> {
        self.inner.delete_prerequisite(edge).await
    }

    async fn list_prerequisites(&self) -> Result<Vec<PrerequisiteEdge>> {
        self.inner.list_prerequisites().await
    }

    async fn save_course(&self, course: &Course) -> Result<()> {
        self.inner.save_course(course).await
    }

    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>> {
        self.inner.load_course(id).await
    }

    async fn list_courses_for_student(&self, student: &StudentId) -> Result<Vec<Course>> {
        self.inner.list_courses_for_student(student).await
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.inner.save_profile(profile).await
    }

    async fn load_profile(&self, student: &StudentId) -> Result<Option<LearnerProfile>> {
        self.inner.load_profile(student).await
    }

    async fn load_mastery(&self, key: &MasteryKey) -> Result<Option<MasteryRecord>> {
        self.inner.load_mastery(key).await
    }

    async fn list_mastery(&self, student: &StudentId, course: &CourseId) -> Result<Vec<MasteryRecord>> {
        self.inner.list_mastery(student, course).await
    }

    async fn compare_and_set_mastery(
        &self,
        key: &MasteryKey,
        expected_version: Option<u64>,
        level: f64,
        at: Time,
    ) -> Result<MasteryRecord> {
        let contended = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if contended {
            let current = self.inner.load_mastery(key).await?;
            let version = current.as_ref().map(|r| r.version);
            let competing = current.map_or(0.5, |r| r.level);
            self.inner.compare_and_set_mastery(key, version, competing, at).await?;
        }
        self.inner.compare_and_set_mastery(key, expected_version, level, at).await
    }

    async fn append_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.inner.append_activity(record).await
    }

    async fn list_activities(&self, student: &StudentId, course: &CourseId) -> Result<Vec<ActivityRecord>> {
        self.inner.list_activities(student, course).await
    }

    async fn list_course_activities(&self, course: &CourseId, since: Time) -> Result<Vec<ActivityRecord>> {
        self.inner.list_course_activities(course, since).await
    }

    async fn save_pathway(&self, pathway: &Pathway) -> Result<()> {
        self.inner.save_pathway(pathway).await
    }

    async fn load_pathway(&self, student: &StudentId, course: &CourseId) -> Result<Option<Pathway>> {
        self.inner.load_pathway(student, course).await
    }
}

/// Chain a(0) <- b(1) <- c(2) in course c1 with s1 and s2 enrolled.
pub(crate) struct Harness {
    pub storage: Arc<ContendedStorage>,
    pub graph: Arc<SkillGraph>,
    pub cache: Arc<PathwayCache>,
    pub hub: Arc<BroadcastHub>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new() -> Self {
        let graph = SkillGraph::new();
        graph.add_skill(Skill::new("a", "A", 0, "general")).unwrap();
        graph.add_skill(Skill::new("b", "B", 1, "general")).unwrap();
        graph.add_skill(Skill::new("c", "C", 2, "general")).unwrap();
        graph.add_prerequisite(&SkillId::from("b"), &SkillId::from("a")).unwrap();
        graph.add_prerequisite(&SkillId::from("c"), &SkillId::from("b")).unwrap();

        let storage = Arc::new(ContendedStorage::default());
        let mut course = Course::new("c1", "Course");
        for id in ["a", "b", "c"] {
            course.add_skill(SkillId::from(id));
        }
        course.enroll(StudentId::from("s1"));
        course.enroll(StudentId::from("s2"));
        storage.save_course(&course).await.unwrap();

        let clock = Arc::new(ManualClock::new(
            chrono::DateTime::parse_from_rfc3339("2025-03-03T09:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        ));

        Self {
            storage,
            graph: Arc::new(graph),
            cache: Arc::new(PathwayCache::new(std::time::Duration::from_secs(3600), clock.clone())),
            hub: Arc::new(BroadcastHub::new(64)),
            clock,
        }
    }

    pub fn analytics(&self) -> Arc<RealTimeAnalytics> {
        self.with_config(|c| c)
    }

    pub fn with_config(&self, f: impl FnOnce(AnalyticsConfig) -> AnalyticsConfig) -> Arc<RealTimeAnalytics> {
        Arc::new(
            RealTimeAnalytics::new(
                self.storage.clone(),
                self.graph.clone(),
                self.cache.clone(),
                self.hub.clone(),
                f(AnalyticsConfig::default()),
            )
            .with_clock(self.clock.clone()),
        )
    }

    pub async fn track(
        &self,
        analytics: &RealTimeAnalytics,
        skill: &str,
        progress: ProgressData,
    ) -> crate::Result<MasteryRecord> {
        self.track_for(analytics, "s1", skill, progress).await
    }

    pub async fn track_for(
        &self,
        analytics: &RealTimeAnalytics,
        student: &str,
        skill: &str,
        progress: ProgressData,
    ) -> crate::Result<MasteryRecord> {
        analytics
            .track_student_progress(
                &StudentId::from(student),
                &CourseId::from("c1"),
                &SkillId::from(skill),
                progress,
            )
            .await
    }

    pub async fn set_style(&self, student: &str, style: LearningStyle) {
        self.storage
            .save_profile(&LearnerProfile::new(student, style, Difficulty::Intermediate))
            .await
            .unwrap();
    }

    /// Cache a pathway over a, b and c for s1.
    pub async fn cache_pathway(&self) {
        let pathway = self.pathway(&["a", "b", "c"]);
        self.cache.insert(pathway).await;
    }

    pub fn pathway(&self, skills: &[&str]) -> Pathway {
        let steps = skills
            .iter()
            .map(|id| {
                let skill = self.graph.skill(&SkillId::from(*id)).unwrap();
                skillpath_core::PathwayStep::new(vec![skillpath_core::PlannedSkill {
                    checkpoint: skillpath_core::Checkpoint {
                        kind: skillpath_core::CheckpointKind::Assessment,
                        title: format!("{} checkpoint", skill.name),
                        pass_threshold: 0.75,
                    },
                    content: vec![skillpath_core::AdaptedContent {
                        content: LearningContent::Text { title: "Notes".into(), body_ref: "notes.md".into() },
                        adaptation: skillpath_core::Adaptation::Baseline,
                    }],
                    estimated_minutes: 60,
                    skill,
                }])
            })
            .collect();
        Pathway {
            id: PathwayId::new(),
            student_id: StudentId::from("s1"),
            course_id: CourseId::from("c1"),
            steps,
            metadata: PathwayMetadata {
                difficulty: Difficulty::Intermediate,
                learning_style: LearningStyle::Reading,
                estimated_total_minutes: 60 * skills.len() as u32,
            },
            created_at: chrono::Utc::now(),
        }
    }
}

/// Progress with a score, content kind and half an hour of study.
pub(crate) fn progress(score: f64, kind: ContentKind) -> ProgressData {
    ProgressData {
        score,
        time_spent_minutes: 30.0,
        content_kind: Some(kind),
        completed: false,
    }
}

/// Completed checkpoint with a score.
pub(crate) fn completed(score: f64, kind: ContentKind) -> ProgressData {
    ProgressData {
        completed: true,
        ..progress(score, kind)
    }
}
