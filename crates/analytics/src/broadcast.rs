//! Periodic analytics broadcast.
//!
//! One spawned task per course. Each tick computes a snapshot (with
//! patterns and insights) for every enrolled student and publishes it.
//! Cancellation is checked before a tick starts its work, so a tick that
//! has begun always publishes a complete round.

use std::sync::Arc;
use std::time::Duration;

use skillpath_core::{AnalyticsEvent, CourseId};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::tracker::RealTimeAnalytics;

/// Handle to a running broadcast loop. Dropping it stops the loop.
pub struct BroadcastHandle {
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl BroadcastHandle {
    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop the loop and wait for it to exit.
    pub async fn cancel(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(error) = join.await {
                warn!(%error, "analytics broadcast task failed");
            }
        }
    }
}

impl Drop for BroadcastHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl RealTimeAnalytics {
    /// Publish snapshots for every student of `course` every `period`.
    ///
    /// The first round runs immediately.
    pub fn start_analytics_broadcast(self: &Arc<Self>, course: CourseId, period: Duration) -> BroadcastHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let analytics = Arc::clone(self);
        let period = period.max(Duration::from_millis(1));

        let join = tokio::spawn(async move {
            info!(%course, ?period, "analytics broadcast started");
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if cancelled.is_cancelled() {
                            break;
                        }
                        match analytics.broadcast_round(&course).await {
                            Ok(published) => debug!(%course, published, "analytics round published"),
                            Err(error) => warn!(%course, %error, "analytics round failed"),
                        }
                    }
                }
            }
            info!(%course, "analytics broadcast stopped");
        });

        BroadcastHandle { token, join: Some(join) }
    }

    /// Publish one snapshot per enrolled student. Returns how many were
    /// published.
    pub async fn broadcast_round(&self, course: &CourseId) -> Result<usize> {
        let students = self
            .storage
            .load_course(course)
            .await?
            .map(|c| c.students)
            .unwrap_or_default();

        for student in &students {
            let mut snapshot = self.calculate_progress_analytics(student, course, None).await?;
            let patterns = self.detect_learning_patterns(student, course).await?;
            snapshot.insights = self.insights_for(&snapshot, &patterns).await?;
            snapshot.patterns = Some(patterns);
            self.publisher.publish(AnalyticsEvent::Snapshot(snapshot));
        }
        Ok(students.len())
    }
}
