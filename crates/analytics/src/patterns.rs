//! Learning pattern detection over activity history.

use std::collections::{BTreeMap, HashMap};

use chrono::Timelike;
use skillpath_core::{ActivityRecord, ContentKind, CourseId, LearningStyle, PatternReport, StudentId};

use crate::error::Result;
use crate::tracker::RealTimeAnalytics;

/// Hours between consecutive gains, oldest first.
pub(crate) fn gain_intervals(activities: &[ActivityRecord]) -> Vec<f64> {
    let gains: Vec<&ActivityRecord> = activities.iter().filter(|a| a.gain() > 0.0).collect();
    gains
        .windows(2)
        .map(|pair| (pair[1].recorded_at - pair[0].recorded_at).num_seconds() as f64 / 3600.0)
        .collect()
}

/// `1 / (1 + cv)` of the intervals; 1.0 when there is too little data to
/// call the rhythm irregular.
fn consistency(intervals: &[f64]) -> f64 {
    if intervals.len() < 2 {
        return 1.0;
    }
    let n = intervals.len() as f64;
    let mean = intervals.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 1.0;
    }
    let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
    1.0 / (1.0 + variance.sqrt() / mean)
}

/// Style matching the content kind with the largest total gain. Ties go
/// to the kind declared first.
fn inferred_style(activities: &[ActivityRecord]) -> Option<LearningStyle> {
    let mut totals: HashMap<ContentKind, f64> = HashMap::new();
    for activity in activities {
        if let Some(kind) = activity.content_kind {
            if activity.gain() > 0.0 {
                *totals.entry(kind).or_default() += activity.gain();
            }
        }
    }

    let mut ranked: Vec<(ContentKind, f64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.first().map(|(kind, _)| LearningStyle::for_content(*kind))
}

/// Build a pattern report from activity history (oldest first).
pub fn detect_patterns(activities: &[ActivityRecord]) -> PatternReport {
    let intervals = gain_intervals(activities);
    let average = if intervals.is_empty() {
        None
    } else {
        Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
    };

    let mut active_hours = BTreeMap::new();
    for activity in activities {
        *active_hours.entry(activity.recorded_at.hour()).or_insert(0) += 1;
    }

    PatternReport {
        average_hours_between_gains: average,
        consistency: consistency(&intervals),
        inferred_style: inferred_style(activities),
        active_hours,
    }
}

impl RealTimeAnalytics {
    /// Behavioural patterns of a learner in a course.
    pub async fn detect_learning_patterns(&self, student: &StudentId, course: &CourseId) -> Result<PatternReport> {
        let activities = self.storage.list_activities(student, course).await?;
        Ok(detect_patterns(&activities))
    }
}
