//! Fan-out of analytics events to subscribers.

use skillpath_core::AnalyticsEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Sink for analytics events.
pub trait AnalyticsPublisher: Send + Sync {
    /// Publish an event. Returns how many subscribers received it.
    fn publish(&self, event: AnalyticsEvent) -> usize;
}

/// In-process pub/sub over a bounded broadcast channel.
///
/// Slow subscribers lose the oldest events and see `RecvError::Lagged`
/// rather than blocking publishers.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<AnalyticsEvent>,
}

impl BroadcastHub {
    /// Create a hub buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalyticsEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl AnalyticsPublisher for BroadcastHub {
    fn publish(&self, event: AnalyticsEvent) -> usize {
        match self.sender.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                trace!("no analytics subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_core::{CourseId, SkillId, StudentId};

    fn event() -> AnalyticsEvent {
        AnalyticsEvent::Progress {
            student: StudentId::from("s1"),
            course: CourseId::from("c1"),
            skill: SkillId::from("a"),
            previous_level: 0.0,
            level: 0.5,
            at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let hub = BroadcastHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let sent = event();
        assert_eq!(hub.publish(sent.clone()), 2);
        assert_eq!(first.recv().await.unwrap(), sent);
        assert_eq!(second.recv().await.unwrap(), sent);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = BroadcastHub::new(8);
        assert_eq!(hub.publish(event()), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
