//! Pathway generation.
//!
//! Turns a learner's current skills and target skills into an ordered
//! pathway. Each target contributes its shortest prerequisite chain from the
//! graph; skills the learner has already mastered are dropped, and the rest
//! are planned with style-ordered, difficulty-adapted content, a time
//! estimate and a checkpoint.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skillpath_core::{
    Checkpoint, CheckpointKind, Clock, CourseId, Difficulty, LearningStyle, NextStep, Pathway,
    PathwayConfig, PathwayId, PathwayMetadata, PathwayStep, PlannedSkill, Skill, SkillId, StudentId,
    SystemClock,
};
use skillpath_graph::{GraphError, SkillGraph};
use skillpath_storage::{ContentCatalog, Storage};
use tracing::{debug, info, instrument};

use crate::adapter::ContentAdapter;
use crate::error::{PathwayError, Result};
use crate::estimator::TimeEstimator;

/// Input to [`PathwayGenerator::generate_pathway`].
///
/// Style and difficulty arrive as free text (CLI flags, request bodies) and
/// are validated on use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayRequest {
    /// The learner
    pub student_id: StudentId,

    /// Course context
    pub course_id: CourseId,

    /// Skills the learner already holds
    #[serde(default)]
    pub current_skills: Vec<SkillId>,

    /// Skills to reach
    pub target_skills: Vec<SkillId>,

    /// Learning style name
    pub learning_style: String,

    /// Difficulty name
    pub difficulty: String,
}

impl PathwayRequest {
    /// Create a request with no current skills.
    pub fn new(
        student_id: impl Into<StudentId>,
        course_id: impl Into<CourseId>,
        target_skills: Vec<SkillId>,
        learning_style: impl Into<String>,
        difficulty: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            course_id: course_id.into(),
            current_skills: Vec::new(),
            target_skills,
            learning_style: learning_style.into(),
            difficulty: difficulty.into(),
        }
    }

    /// Set the skills the learner already holds.
    pub fn with_current_skills(mut self, skills: Vec<SkillId>) -> Self {
        self.current_skills = skills;
        self
    }

    /// Validate style and difficulty. Difficulty is checked first.
    pub fn preferences(&self) -> Result<(LearningStyle, Difficulty)> {
        let difficulty = self
            .difficulty
            .parse::<Difficulty>()
            .map_err(|_| PathwayError::InvalidDifficulty(self.difficulty.clone()))?;
        let style = self
            .learning_style
            .parse::<LearningStyle>()
            .map_err(|_| PathwayError::InvalidLearningStyle(self.learning_style.clone()))?;
        Ok((style, difficulty))
    }
}

/// Pathway generator.
pub struct PathwayGenerator {
    graph: Arc<SkillGraph>,
    storage: Arc<dyn Storage>,
    catalog: Arc<dyn ContentCatalog>,
    clock: Arc<dyn Clock>,
    adapter: ContentAdapter,
    estimator: TimeEstimator,
}

impl PathwayGenerator {
    /// Create a generator using the system clock.
    pub fn new(
        graph: Arc<SkillGraph>,
        storage: Arc<dyn Storage>,
        catalog: Arc<dyn ContentCatalog>,
        config: &PathwayConfig,
    ) -> Self {
        Self {
            graph,
            storage,
            catalog,
            clock: Arc::new(SystemClock),
            adapter: ContentAdapter,
            estimator: TimeEstimator::from_config(config),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The skill graph this generator plans over.
    pub fn graph(&self) -> &Arc<SkillGraph> {
        &self.graph
    }

    /// Generate a pathway for a request.
    #[instrument(skip(self, request), fields(student = %request.student_id, course = %request.course_id))]
    pub async fn generate_pathway(&self, request: &PathwayRequest) -> Result<Pathway> {
        let (style, difficulty) = request.preferences()?;
        let sequence = self.plan_sequence(&request.current_skills, &request.target_skills)?;

        let learner = self
            .storage
            .load_learner_state(&request.student_id, &request.course_id)
            .await?;
        let threshold = difficulty.mastery_threshold();

        let mut steps = Vec::with_capacity(sequence.len());
        for id in sequence {
            let mastery = learner.mastery_of(&id);
            if mastery > threshold {
                debug!(skill = %id, mastery, "skipping mastered skill");
                continue;
            }
            let skill = self.graph.skill(&id).ok_or_else(|| GraphError::SkillNotFound(id.clone()))?;
            let planned = self.plan_skill(&skill, mastery, style, difficulty).await?;
            steps.push(PathwayStep::new(vec![planned]));
        }

        let estimated_total_minutes = steps.iter().map(PathwayStep::estimated_minutes).sum();
        let pathway = Pathway {
            id: PathwayId::new(),
            student_id: request.student_id.clone(),
            course_id: request.course_id.clone(),
            steps,
            metadata: PathwayMetadata {
                difficulty,
                learning_style: style,
                estimated_total_minutes,
            },
            created_at: self.clock.now(),
        };

        info!(
            steps = pathway.steps.len(),
            minutes = estimated_total_minutes,
            "generated pathway"
        );
        Ok(pathway)
    }

    /// Ordered, de-duplicated skill sequence covering every target.
    ///
    /// Skills in `current` are never included. Unknown current skills are
    /// ignored; unknown targets fail with [`GraphError::SkillNotFound`].
    pub fn plan_sequence(&self, current: &[SkillId], targets: &[SkillId]) -> Result<Vec<SkillId>> {
        let held: HashSet<&SkillId> = current.iter().collect();
        let mut seen = HashSet::new();
        let mut sequence = Vec::new();

        for target in targets {
            if !self.graph.contains(target) {
                return Err(GraphError::SkillNotFound(target.clone()).into());
            }
            for id in self.path_to(current, target)? {
                if !held.contains(&id) && seen.insert(id.clone()) {
                    sequence.push(id);
                }
            }
        }
        Ok(sequence)
    }

    /// Shortest chain ending at `target`.
    ///
    /// Starts from the nearest current skill (excluded from the result, the
    /// learner holds it), or else from the nearest root (included). Ties go
    /// to the earlier current skill or root.
    fn path_to(&self, current: &[SkillId], target: &SkillId) -> Result<Vec<SkillId>> {
        let mut best: Option<Vec<SkillId>> = None;
        for start in current {
            if !self.graph.contains(start) {
                debug!(skill = %start, "ignoring unknown current skill");
                continue;
            }
            match self.graph.shortest_path(start, target) {
                Ok(path) => {
                    if best.as_ref().map_or(true, |b| path.len() < b.len()) {
                        best = Some(path);
                    }
                }
                Err(GraphError::NotReachable { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if let Some(path) = best {
            return Ok(path.into_iter().skip(1).collect());
        }

        for root in self.graph.roots_of(target)? {
            let path = self.graph.shortest_path(&root, target)?;
            if best.as_ref().map_or(true, |b| path.len() < b.len()) {
                best = Some(path);
            }
        }
        Ok(best.unwrap_or_else(|| vec![target.clone()]))
    }

    /// Plan one skill: ordered, adapted content plus estimate and checkpoint.
    pub async fn plan_skill(
        &self,
        skill: &Skill,
        mastery: f64,
        style: LearningStyle,
        difficulty: Difficulty,
    ) -> Result<PlannedSkill> {
        let items = self.catalog.content_for(&skill.id).await?;
        Ok(PlannedSkill {
            content: self.adapter.prepare(items, skill, style, difficulty),
            estimated_minutes: self.estimator.estimate(mastery),
            checkpoint: Checkpoint {
                kind: CheckpointKind::for_difficulty(difficulty),
                title: format!("{} checkpoint", skill.name),
                pass_threshold: difficulty.mastery_threshold(),
            },
            skill: skill.clone(),
        })
    }

    /// The single next skill to study.
    ///
    /// Candidates are uncompleted skills whose prerequisites are all in
    /// `completed`, limited to the course's skills when the course lists
    /// any. The lowest level wins, then insertion order. `None` when
    /// nothing is left.
    #[instrument(skip_all, fields(student = %student, course = %course))]
    pub async fn get_next_recommended_step(
        &self,
        student: &StudentId,
        course: &CourseId,
        completed: &[SkillId],
    ) -> Result<Option<NextStep>> {
        for id in completed {
            if !self.graph.contains(id) {
                return Err(GraphError::SkillNotFound(id.clone()).into());
            }
        }
        let done: HashSet<&SkillId> = completed.iter().collect();

        let scope: Option<HashSet<SkillId>> = match self.storage.load_course(course).await? {
            Some(c) if !c.skills.is_empty() => Some(c.skills.into_iter().collect()),
            _ => None,
        };

        let next = self
            .graph
            .skills()
            .into_iter()
            .filter(|s| !done.contains(&s.id))
            .filter(|s| scope.as_ref().map_or(true, |scope| scope.contains(&s.id)))
            .filter(|s| {
                self.graph
                    .prerequisite_ids(&s.id)
                    .iter()
                    .all(|p| done.contains(p))
            })
            .min_by_key(|s| (s.level, self.graph.rank(&s.id).unwrap_or(usize::MAX)));

        let Some(skill) = next else {
            debug!("no remaining skills");
            return Ok(None);
        };

        let learner = self.storage.load_learner_state(student, course).await?;
        let estimated_minutes = self.estimator.estimate(learner.mastery_of(&skill.id));
        Ok(Some(NextStep { skill, estimated_minutes }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{groups, ids, Fixture};
    use skillpath_core::{Adaptation, ContentKind, Course, LearningContent};
    use skillpath_storage::Storage;

    fn request(targets: &[&str], style: &str, difficulty: &str) -> PathwayRequest {
        PathwayRequest::new("s1", "c1", ids(targets), style, difficulty)
    }

    #[tokio::test]
    async fn test_linear_chain_yields_one_group_per_skill() {
        let fixture = Fixture::chain();
        let pathway = fixture
            .generator()
            .generate_pathway(&request(&["c"], "reading", "intermediate"))
            .await
            .unwrap();

        assert_eq!(pathway.groups(), groups(&[&["a"], &["b"], &["c"]]));
        assert_eq!(pathway.metadata.estimated_total_minutes, 180);
        assert_eq!(pathway.created_at, fixture.clock.now());
    }

    #[tokio::test]
    async fn test_invalid_difficulty_fails_before_traversal() {
        let fixture = Fixture::chain();
        // Unknown target would fail traversal, so this proves the order
        let err = fixture
            .generator()
            .generate_pathway(&request(&["missing"], "reading", "invalid"))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::InvalidDifficulty(ref d) if d == "invalid"));
    }

    #[tokio::test]
    async fn test_difficulty_must_match_exactly() {
        let fixture = Fixture::chain();
        let err = fixture
            .generator()
            .generate_pathway(&request(&["c"], "reading", " Advanced "))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::InvalidDifficulty(ref d) if d == " Advanced "));
    }

    #[tokio::test]
    async fn test_invalid_style() {
        let fixture = Fixture::chain();
        let err = fixture
            .generator()
            .generate_pathway(&request(&["c"], "telepathic", "beginner"))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::InvalidLearningStyle(_)));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let fixture = Fixture::chain();
        let err = fixture
            .generator()
            .generate_pathway(&request(&["z"], "reading", "beginner"))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::Graph(GraphError::SkillNotFound(_))));
    }

    #[tokio::test]
    async fn test_current_skills_are_skipped() {
        let fixture = Fixture::chain();
        let req = request(&["c"], "reading", "intermediate").with_current_skills(ids(&["a"]));
        let pathway = fixture.generator().generate_pathway(&req).await.unwrap();
        assert_eq!(pathway.skill_ids(), ids(&["b", "c"]));
    }

    #[tokio::test]
    async fn test_mastered_skills_are_dropped() {
        let fixture = Fixture::chain();
        fixture.master("b", 0.9).await;
        // Exactly at threshold still counts as not mastered
        fixture.master("a", 0.75).await;

        let pathway = fixture
            .generator()
            .generate_pathway(&request(&["c"], "reading", "intermediate"))
            .await
            .unwrap();
        assert_eq!(pathway.skill_ids(), ids(&["a", "c"]));
        // a at 0.75 mastery: 60 * 0.25 = 15 minutes
        assert_eq!(pathway.steps[0].skills[0].estimated_minutes, 15);
    }

    #[tokio::test]
    async fn test_threshold_follows_difficulty() {
        let fixture = Fixture::chain();
        fixture.master("a", 0.7).await;

        let beginner = fixture
            .generator()
            .generate_pathway(&request(&["c"], "reading", "beginner"))
            .await
            .unwrap();
        assert_eq!(beginner.skill_ids(), ids(&["b", "c"]));

        let advanced = fixture
            .generator()
            .generate_pathway(&request(&["c"], "reading", "advanced"))
            .await
            .unwrap();
        assert_eq!(advanced.skill_ids(), ids(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn test_multiple_targets_are_merged_without_duplicates() {
        let fixture = Fixture::chain();
        fixture.skill("d", 2);
        fixture.edge("d", "b");

        let pathway = fixture
            .generator()
            .generate_pathway(&request(&["c", "d"], "reading", "intermediate"))
            .await
            .unwrap();
        assert_eq!(pathway.skill_ids(), ids(&["a", "b", "c", "d"]));
    }

    #[tokio::test]
    async fn test_root_start_prefers_shortest_chain() {
        let fixture = Fixture::empty();
        fixture.skill("far", 0);
        fixture.skill("mid", 1);
        fixture.skill("near", 1);
        fixture.skill("goal", 2);
        fixture.edge("mid", "far");
        fixture.edge("goal", "mid");
        fixture.edge("goal", "near");

        let sequence = fixture.generator().plan_sequence(&[], &ids(&["goal"])).unwrap();
        assert_eq!(sequence, ids(&["near", "goal"]));
    }

    #[tokio::test]
    async fn test_content_is_ordered_and_adapted() {
        let fixture = Fixture::chain();
        fixture
            .content("a", LearningContent::Text { title: "Notes".into(), body_ref: "a.md".into() })
            .await;
        fixture
            .content(
                "a",
                LearningContent::Video { title: "Intro".into(), url: "v".into(), duration_minutes: 5 },
            )
            .await;

        let pathway = fixture
            .generator()
            .generate_pathway(&request(&["a"], "visual", "beginner"))
            .await
            .unwrap();
        let planned = &pathway.steps[0].skills[0];
        assert_eq!(planned.content[0].content.kind(), ContentKind::Video);
        assert!(matches!(planned.content[0].adaptation, Adaptation::Scaffolded { .. }));
        assert_eq!(planned.checkpoint.kind, CheckpointKind::Quiz);
        assert_eq!(planned.checkpoint.pass_threshold, 0.60);
    }

    #[tokio::test]
    async fn test_next_step_starts_at_roots() {
        let fixture = Fixture::chain();
        fixture.skill("x", 1);
        let generator = fixture.generator();
        let (student, course) = (StudentId::from("s1"), CourseId::from("c1"));

        let first = generator
            .get_next_recommended_step(&student, &course, &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.skill.id, SkillId::from("a"));
        assert_eq!(first.estimated_minutes, 60);

        // b and x are both available at level 1; b was inserted first
        let second = generator
            .get_next_recommended_step(&student, &course, &ids(&["a"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.skill.id, SkillId::from("b"));

        let done = generator
            .get_next_recommended_step(&student, &course, &ids(&["a", "b", "c", "x"]))
            .await
            .unwrap();
        assert!(done.is_none());
    }

    #[tokio::test]
    async fn test_next_step_respects_course_scope() {
        let fixture = Fixture::chain();
        let mut course = Course::new("c1", "Course");
        course.add_skill(SkillId::from("b"));
        course.add_skill(SkillId::from("c"));
        fixture.storage.save_course(&course).await.unwrap();

        let next = fixture
            .generator()
            .get_next_recommended_step(&StudentId::from("s1"), &CourseId::from("c1"), &ids(&["a"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.skill.id, SkillId::from("b"));

        let err = fixture
            .generator()
            .get_next_recommended_step(&StudentId::from("s1"), &CourseId::from("c1"), &ids(&["nope"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::Graph(GraphError::SkillNotFound(_))));
    }
}
