//! Real-time progress tracking.
//!
//! Mastery writes go through the storage's compare-and-set so concurrent
//! updates for the same (student, course, skill) never lose each other;
//! a conflicting writer re-reads and retries with exponential backoff.

use std::sync::Arc;

use skillpath_core::{
    ActivityId, ActivityRecord, AnalyticsConfig, AnalyticsEvent, Clock, CourseId, MasteryRecord,
    ProgressData, SkillId, StudentId, SystemClock,
};
use skillpath_graph::{GraphError, SkillGraph};
use skillpath_pathway::PathwayCache;
use skillpath_storage::{MasteryKey, Storage, StorageError};
use tracing::{debug, info, instrument};

use crate::error::{AnalyticsError, Result};
use crate::hub::AnalyticsPublisher;

/// Mastery after one interaction.
///
/// Moves `weight` of the way towards a higher score and never below the
/// current level. A completed checkpoint lifts the level to at least the
/// score.
pub fn next_level(current: f64, progress: &ProgressData, weight: f64) -> f64 {
    let blended = current + (progress.score - current) * weight;
    let mut level = current.max(blended);
    if progress.completed {
        level = level.max(progress.score);
    }
    level.clamp(0.0, 1.0)
}

/// Real-time analytics service.
pub struct RealTimeAnalytics {
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) graph: Arc<SkillGraph>,
    pub(crate) cache: Arc<PathwayCache>,
    pub(crate) publisher: Arc<dyn AnalyticsPublisher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: AnalyticsConfig,
}

impl RealTimeAnalytics {
    /// Create a service using the system clock.
    pub fn new(
        storage: Arc<dyn Storage>,
        graph: Arc<SkillGraph>,
        cache: Arc<PathwayCache>,
        publisher: Arc<dyn AnalyticsPublisher>,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            storage,
            graph,
            cache,
            publisher,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Active settings.
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Record one learning interaction.
    ///
    /// Stores the new mastery, appends an activity record, drops the
    /// student's cached pathways when the level moved and publishes a
    /// progress event. Returns the stored mastery.
    #[instrument(skip_all, fields(student = %student, course = %course, skill = %skill))]
    pub async fn track_student_progress(
        &self,
        student: &StudentId,
        course: &CourseId,
        skill: &SkillId,
        progress: ProgressData,
    ) -> Result<MasteryRecord> {
        validate(&progress)?;
        if !self.graph.contains(skill) {
            return Err(GraphError::SkillNotFound(skill.clone()).into());
        }

        let key = MasteryKey::new(student.clone(), course.clone(), skill.clone());
        let (previous, record) = self.write_mastery(&key, &progress).await?;

        let activity = ActivityRecord {
            id: ActivityId::new(),
            student: student.clone(),
            course: course.clone(),
            skill: skill.clone(),
            level_before: previous,
            level_after: record.level,
            content_kind: progress.content_kind,
            time_spent_minutes: progress.time_spent_minutes,
            recorded_at: record.updated_at,
        };
        self.storage.append_activity(&activity).await?;

        if record.level != previous {
            let dropped = self.cache.invalidate_student(student).await;
            debug!(dropped, "invalidated cached pathways");
        }

        let delivered = self.publisher.publish(AnalyticsEvent::Progress {
            student: student.clone(),
            course: course.clone(),
            skill: skill.clone(),
            previous_level: previous,
            level: record.level,
            at: record.updated_at,
        });

        info!(
            previous,
            level = record.level,
            version = record.version,
            delivered,
            "tracked progress"
        );
        Ok(record)
    }

    /// Read-compute-CAS loop. Returns the level before the write and the
    /// stored record.
    async fn write_mastery(&self, key: &MasteryKey, progress: &ProgressData) -> Result<(f64, MasteryRecord)> {
        let max_attempts = self.config.max_update_retries.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let current = self.storage.load_mastery(key).await?;
            let (previous, version) = current.map_or((0.0, None), |r| (r.level, Some(r.version)));
            let level = next_level(previous, progress, self.config.level_update_weight);

            match self
                .storage
                .compare_and_set_mastery(key, version, level, self.clock.now())
                .await
            {
                Ok(record) => return Ok((previous, record)),
                Err(StorageError::ConcurrentModification { .. }) if attempt < max_attempts => {
                    let backoff = self
                        .config
                        .retry_backoff()
                        .saturating_mul(2u32.saturating_pow(attempt - 1));
                    debug!(attempt, ?backoff, "mastery write conflicted, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(StorageError::ConcurrentModification { key, .. }) => {
                    return Err(AnalyticsError::ConcurrentModification { key, attempts: attempt });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Skills the course lists, or every skill in the graph when it lists
    /// none.
    pub(crate) async fn course_skills(&self, course: &CourseId) -> Result<Vec<SkillId>> {
        let listed = self
            .storage
            .load_course(course)
            .await?
            .map(|c| c.skills)
            .unwrap_or_default();
        if !listed.is_empty() {
            return Ok(listed);
        }
        Ok(self.graph.skills().into_iter().map(|s| s.id).collect())
    }
}

fn validate(progress: &ProgressData) -> Result<()> {
    if !(0.0..=1.0).contains(&progress.score) {
        return Err(AnalyticsError::InvalidProgress(format!(
            "score {} outside [0, 1]",
            progress.score
        )));
    }
    if !progress.time_spent_minutes.is_finite() || progress.time_spent_minutes < 0.0 {
        return Err(AnalyticsError::InvalidProgress(format!(
            "time spent {} must be a non-negative number of minutes",
            progress.time_spent_minutes
        )));
    }
    Ok(())
}
