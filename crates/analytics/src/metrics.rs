//! Progress and effectiveness metrics.

use std::collections::{BTreeSet, HashMap};

use skillpath_core::{
    ActivityRecord, AnalyticsSnapshot, CourseId, EffectivenessReport, Pathway, SkillId, StudentId,
};
use tracing::instrument;

use crate::error::Result;
use crate::tracker::RealTimeAnalytics;

/// Completion rate and mean mastery over `skills`.
fn course_summary(mastery: &HashMap<SkillId, f64>, skills: &[SkillId], threshold: f64) -> (f64, f64) {
    if skills.is_empty() {
        return (0.0, 0.0);
    }
    let levels: Vec<f64> = skills
        .iter()
        .map(|id| mastery.get(id).copied().unwrap_or(0.0))
        .collect();
    let completed = levels.iter().filter(|l| **l >= threshold).count();
    let total = skills.len() as f64;
    (completed as f64 / total, levels.iter().sum::<f64>() / total)
}

/// Mastery gained per hour of recorded study time.
fn learning_rate<'a>(activities: impl Iterator<Item = &'a ActivityRecord>) -> f64 {
    let (gain, minutes) = activities.fold((0.0, 0.0), |(gain, minutes), a| {
        (gain + a.gain(), minutes + a.time_spent_minutes)
    });
    if minutes > 0.0 {
        gain / (minutes / 60.0)
    } else {
        0.0
    }
}

/// Percentage of a pathway's skills at or above their checkpoint threshold.
fn pathway_progress(pathway: &Pathway, mastery: &HashMap<SkillId, f64>) -> f64 {
    let planned: Vec<_> = pathway.planned_skills().collect();
    if planned.is_empty() {
        return 0.0;
    }
    let passed = planned
        .iter()
        .filter(|p| mastery.get(&p.skill.id).copied().unwrap_or(0.0) >= p.checkpoint.pass_threshold)
        .count();
    passed as f64 / planned.len() as f64 * 100.0
}

/// Hours from the first activity on each skill to the first activity
/// that brought it to `threshold`.
fn completion_hours(activities: &[ActivityRecord], threshold: f64) -> Vec<f64> {
    let mut first_seen: HashMap<&SkillId, &ActivityRecord> = HashMap::new();
    let mut hours = Vec::new();
    let mut done = BTreeSet::new();
    for activity in activities {
        let started = *first_seen.entry(&activity.skill).or_insert(activity);
        if activity.level_after >= threshold && done.insert(&activity.skill) {
            let elapsed = activity.recorded_at - started.recorded_at;
            hours.push(elapsed.num_seconds() as f64 / 3600.0);
        }
    }
    hours
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl RealTimeAnalytics {
    /// Current progress of a learner in a course.
    ///
    /// The learning rate covers `skill` when given and all of the course's
    /// activity otherwise. Pathway progress reads the cached pathway,
    /// falling back to the last stored one.
    #[instrument(skip_all, fields(student = %student, course = %course))]
    pub async fn calculate_progress_analytics(
        &self,
        student: &StudentId,
        course: &CourseId,
        skill: Option<&SkillId>,
    ) -> Result<AnalyticsSnapshot> {
        let skills = self.course_skills(course).await?;
        let mastery: HashMap<SkillId, f64> = self
            .storage
            .list_mastery(student, course)
            .await?
            .into_iter()
            .map(|r| (r.skill, r.level))
            .collect();
        let (completion_rate, average_level) =
            course_summary(&mastery, &skills, self.config.completion_threshold);

        let activities = self.storage.list_activities(student, course).await?;
        let rate = learning_rate(
            activities
                .iter()
                .filter(|a| skill.map_or(true, |s| &a.skill == s)),
        );

        let pathway = match self.cache.get(student, course).await {
            Some(pathway) => Some(pathway),
            None => self.storage.load_pathway(student, course).await?,
        };

        Ok(AnalyticsSnapshot {
            student: student.clone(),
            course: course.clone(),
            skill: skill.cloned(),
            total_skills: skills.len(),
            completion_rate,
            average_level,
            learning_rate: rate,
            pathway_progress: pathway.map_or(0.0, |p| pathway_progress(&p, &mastery)),
            patterns: None,
            insights: Vec::new(),
            generated_at: self.clock.now(),
        })
    }

    /// Aggregate outcomes of students active in the last `window`.
    #[instrument(skip_all, fields(course = %course))]
    pub async fn analyze_pathway_effectiveness(
        &self,
        course: &CourseId,
        window: chrono::Duration,
    ) -> Result<EffectivenessReport> {
        let since = self.clock.now() - window;
        let active: BTreeSet<StudentId> = self
            .storage
            .list_course_activities(course, since)
            .await?
            .into_iter()
            .map(|a| a.student)
            .collect();

        let skills = self.course_skills(course).await?;
        let threshold = self.config.completion_threshold;
        let mut hours = Vec::new();
        let mut levels = Vec::with_capacity(active.len());
        let mut rates = Vec::with_capacity(active.len());

        for student in &active {
            let history = self.storage.list_activities(student, course).await?;
            hours.extend(completion_hours(&history, threshold));

            let mastery: HashMap<SkillId, f64> = self
                .storage
                .list_mastery(student, course)
                .await?
                .into_iter()
                .map(|r| (r.skill, r.level))
                .collect();
            let (rate, level) = course_summary(&mastery, &skills, threshold);
            rates.push(rate);
            levels.push(level);
        }

        Ok(EffectivenessReport {
            course: course.clone(),
            average_completion_hours: mean(&hours),
            average_skill_level: mean(&levels),
            completion_rate: mean(&rates),
            student_count: active.len(),
        })
    }
}
