//! Shared test fixtures.

use std::sync::Arc;

use skillpath_core::{
    CourseId, LearningContent, ManualClock, PathwayConfig, Skill, SkillId, StudentId,
};
use skillpath_graph::SkillGraph;
use skillpath_storage::{ContentCatalog, MasteryKey, MemoryStorage, Storage};

use crate::generator::PathwayGenerator;

pub(crate) struct Fixture {
    pub graph: Arc<SkillGraph>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub config: PathwayConfig,
}

impl Fixture {
    /// Chain a(0) <- b(1) <- c(2).
    pub fn chain() -> Self {
        let fixture = Self::empty();
        fixture.skill("a", 0);
        fixture.skill("b", 1);
        fixture.skill("c", 2);
        fixture.edge("b", "a");
        fixture.edge("c", "b");
        fixture
    }

    pub fn empty() -> Self {
        Self {
            graph: Arc::new(SkillGraph::new()),
            storage: Arc::new(MemoryStorage::new()),
            clock: Arc::new(ManualClock::new(chrono::Utc::now())),
            config: PathwayConfig::default(),
        }
    }

    pub fn skill(&self, id: &str, level: u32) {
        self.graph
            .add_skill(Skill::new(id, id.to_uppercase(), level, "general"))
            .unwrap();
    }

    pub fn edge(&self, skill: &str, prerequisite: &str) {
        self.graph
            .add_prerequisite(&SkillId::from(skill), &SkillId::from(prerequisite))
            .unwrap();
    }

    pub async fn master(&self, skill: &str, level: f64) {
        let key = MasteryKey::new(StudentId::from("s1"), CourseId::from("c1"), SkillId::from(skill));
        let current = self.storage.load_mastery(&key).await.unwrap().map(|r| r.version);
        self.storage
            .compare_and_set_mastery(&key, current, level, chrono::Utc::now())
            .await
            .unwrap();
    }

    pub async fn content(&self, skill: &str, item: LearningContent) {
        self.storage.add_content(&SkillId::from(skill), item).await.unwrap();
    }

    pub fn generator(&self) -> Arc<PathwayGenerator> {
        Arc::new(
            PathwayGenerator::new(
                self.graph.clone(),
                self.storage.clone(),
                self.storage.clone(),
                &self.config,
            )
            .with_clock(self.clock.clone()),
        )
    }
}

pub(crate) fn ids(raw: &[&str]) -> Vec<SkillId> {
    raw.iter().map(|s| SkillId::from(*s)).collect()
}

pub(crate) fn groups(raw: &[&[&str]]) -> Vec<Vec<SkillId>> {
    raw.iter().map(|g| ids(g)).collect()
}
