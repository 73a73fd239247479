//! Rule-based insights.

use serde_json::json;
use skillpath_core::{
    ActivityRecord, AnalyticsSnapshot, CourseId, Insight, InsightKind, LearningStyle, PatternReport,
    StudentId, Time,
};

use crate::error::Result;
use crate::tracker::RealTimeAnalytics;

/// Completion rate from which a course counts as nearly done.
const NEAR_COMPLETION: f64 = 0.8;

/// Recent gains must beat earlier ones by this factor to count as
/// accelerating.
const ACCELERATION_FACTOR: f64 = 1.25;

/// Consistency below which the study rhythm is flagged.
const LOW_CONSISTENCY: f64 = 0.5;

/// Everything the insight rules look at.
pub struct InsightContext<'a> {
    /// Activity history, oldest first
    pub activities: &'a [ActivityRecord],
    /// Detected patterns
    pub patterns: &'a PatternReport,
    /// Style from the learner's profile, if one is stored
    pub stated_style: Option<LearningStyle>,
    /// Fraction of course skills completed
    pub completion_rate: f64,
    /// Skills in the course
    pub total_skills: usize,
    /// Evaluation time
    pub now: Time,
    /// No gain for this long counts as stalled
    pub stall_window: chrono::Duration,
}

/// Apply every rule. Insights come out in a fixed rule order.
pub fn derive_insights(ctx: &InsightContext<'_>) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(first) = ctx.activities.first() {
        let last_gain = ctx
            .activities
            .iter()
            .rev()
            .find(|a| a.gain() > 0.0)
            .map_or(first.recorded_at, |a| a.recorded_at);
        let idle = ctx.now - last_gain;
        if idle >= ctx.stall_window {
            insights.push(Insight {
                kind: InsightKind::StalledProgress,
                message: format!("No mastery gained in the last {} hours", idle.num_hours()),
                data: json!({ "hours_since_gain": idle.num_hours() }),
            });
        }
    }

    let gains: Vec<f64> = ctx
        .activities
        .iter()
        .map(ActivityRecord::gain)
        .filter(|g| *g > 0.0)
        .collect();
    if gains.len() >= 4 {
        let half = gains.len() / 2;
        let earlier = gains[..half].iter().sum::<f64>() / half as f64;
        let recent = gains[gains.len() - half..].iter().sum::<f64>() / half as f64;
        if recent > earlier * ACCELERATION_FACTOR {
            insights.push(Insight {
                kind: InsightKind::AcceleratingMastery,
                message: format!("Recent gains average {:.2}, up from {:.2}", recent, earlier),
                data: json!({ "earlier_gain": earlier, "recent_gain": recent }),
            });
        }
    }

    if let (Some(stated), Some(inferred)) = (ctx.stated_style, ctx.patterns.inferred_style) {
        if stated.preferred_content().is_some() && stated != inferred {
            insights.push(Insight {
                kind: InsightKind::StyleMismatch,
                message: format!("Learns most from {} content but prefers {}", inferred, stated),
                data: json!({ "stated": stated.as_str(), "inferred": inferred.as_str() }),
            });
        }
    }

    if ctx.patterns.average_hours_between_gains.is_some() && ctx.patterns.consistency < LOW_CONSISTENCY {
        insights.push(Insight {
            kind: InsightKind::LowConsistency,
            message: "Study sessions are irregular".to_string(),
            data: json!({
                "consistency": ctx.patterns.consistency,
                "average_hours_between_gains": ctx.patterns.average_hours_between_gains,
            }),
        });
    }

    if ctx.total_skills > 0 && ctx.completion_rate >= NEAR_COMPLETION && ctx.completion_rate < 1.0 {
        let remaining = ((1.0 - ctx.completion_rate) * ctx.total_skills as f64).round() as usize;
        insights.push(Insight {
            kind: InsightKind::NearCompletion,
            message: format!("{} skill(s) left to complete the course", remaining),
            data: json!({ "completion_rate": ctx.completion_rate, "remaining_skills": remaining }),
        });
    }

    insights
}

impl RealTimeAnalytics {
    /// Insights for a learner in a course.
    pub async fn generate_insights(&self, student: &StudentId, course: &CourseId) -> Result<Vec<Insight>> {
        let snapshot = self.calculate_progress_analytics(student, course, None).await?;
        let patterns = self.detect_learning_patterns(student, course).await?;
        self.insights_for(&snapshot, &patterns).await
    }

    pub(crate) async fn insights_for(
        &self,
        snapshot: &AnalyticsSnapshot,
        patterns: &PatternReport,
    ) -> Result<Vec<Insight>> {
        let activities = self
            .storage
            .list_activities(&snapshot.student, &snapshot.course)
            .await?;
        let stated_style = self
            .storage
            .load_profile(&snapshot.student)
            .await?
            .map(|p| p.learning_style);

        Ok(derive_insights(&InsightContext {
            activities: &activities,
            patterns,
            stated_style,
            completion_rate: snapshot.completion_rate,
            total_skills: snapshot.total_skills,
            now: self.clock.now(),
            stall_window: chrono::Duration::hours(self.config.stall_window_hours),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::detect_patterns;
    use crate::testing::{progress, Harness};
    use chrono::TimeZone;
    use skillpath_core::{ActivityId, ContentKind, SkillId};

    fn epoch() -> Time {
        chrono::Utc.timestamp_opt(0, 0).unwrap()
    }

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|i| i.kind).collect()
    }

    fn gain_at(hours: i64, before: f64, after: f64) -> ActivityRecord {
        ActivityRecord {
            id: ActivityId::new(),
            student: StudentId::from("s1"),
            course: CourseId::from("c1"),
            skill: SkillId::from("a"),
            level_before: before,
            level_after: after,
            content_kind: None,
            time_spent_minutes: 20.0,
            recorded_at: epoch() + chrono::Duration::hours(hours),
        }
    }

    fn context<'a>(activities: &'a [ActivityRecord], patterns: &'a PatternReport, now_hours: i64) -> InsightContext<'a> {
        InsightContext {
            activities,
            patterns,
            stated_style: None,
            completion_rate: 0.0,
            total_skills: 10,
            now: epoch() + chrono::Duration::hours(now_hours),
            stall_window: chrono::Duration::hours(168),
        }
    }

    #[test]
    fn test_accelerating_mastery() {
        let history = vec![
            gain_at(0, 0.0, 0.05),
            gain_at(24, 0.05, 0.1),
            gain_at(48, 0.1, 0.3),
            gain_at(72, 0.3, 0.5),
        ];
        let patterns = detect_patterns(&history);
        let insights = derive_insights(&context(&history, &patterns, 73));
        assert_eq!(kinds(&insights), vec![InsightKind::AcceleratingMastery]);
    }

    #[test]
    fn test_near_completion() {
        let patterns = detect_patterns(&[]);
        let mut ctx = context(&[], &patterns, 0);
        ctx.completion_rate = 0.8;
        let insights = derive_insights(&ctx);
        assert_eq!(kinds(&insights), vec![InsightKind::NearCompletion]);
        assert_eq!(insights[0].data["remaining_skills"], 2);

        ctx.completion_rate = 1.0;
        assert!(derive_insights(&ctx).is_empty());
    }

    #[test]
    fn test_low_consistency() {
        let history = vec![
            gain_at(0, 0.0, 0.1),
            gain_at(1, 0.1, 0.2),
            gain_at(2, 0.2, 0.3),
            gain_at(60, 0.3, 0.4),
        ];
        let patterns = detect_patterns(&history);
        let insights = derive_insights(&context(&history, &patterns, 61));
        assert!(kinds(&insights).contains(&InsightKind::LowConsistency));
    }

    #[tokio::test]
    async fn test_stalled_progress() {
        let harness = Harness::new().await;
        let analytics = harness.analytics();
        harness.track(&analytics, "a", progress(0.6, ContentKind::Text)).await.unwrap();
        let (student, course) = (StudentId::from("s1"), CourseId::from("c1"));

        harness.clock.advance(chrono::Duration::hours(1));
        let fresh = analytics.generate_insights(&student, &course).await.unwrap();
        assert!(!kinds(&fresh).contains(&InsightKind::StalledProgress));

        harness.clock.advance(chrono::Duration::hours(200));
        let stale = analytics.generate_insights(&student, &course).await.unwrap();
        assert!(kinds(&stale).contains(&InsightKind::StalledProgress));
    }

    #[tokio::test]
    async fn test_style_mismatch_needs_a_profile() {
        let harness = Harness::new().await;
        let analytics = harness.analytics();
        harness.track(&analytics, "a", progress(0.6, ContentKind::Exercise)).await.unwrap();
        let (student, course) = (StudentId::from("s1"), CourseId::from("c1"));

        let without = analytics.generate_insights(&student, &course).await.unwrap();
        assert!(!kinds(&without).contains(&InsightKind::StyleMismatch));

        harness.set_style("s1", LearningStyle::Auditory).await;
        let with = analytics.generate_insights(&student, &course).await.unwrap();
        let mismatch = with.iter().find(|i| i.kind == InsightKind::StyleMismatch).unwrap();
        assert_eq!(mismatch.data["inferred"], "kinesthetic");
    }
}
