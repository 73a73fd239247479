//! Time-bounded pathway cache keyed by student and course.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use skillpath_core::{Clock, CourseId, Pathway, StudentId, Time};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry {
    pathway: Pathway,
    inserted_at: Time,
}

/// Pathway cache.
///
/// Entries older than the TTL are never returned and are evicted on the
/// lookup that finds them expired. Analytics invalidates entries when a
/// learner's mastery changes.
pub struct PathwayCache {
    entries: RwLock<HashMap<(StudentId, CourseId), CacheEntry>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl PathwayCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365 * 100)),
            clock,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: Time) -> bool {
        now - entry.inserted_at >= self.ttl
    }

    /// Cached pathway, if present and fresh.
    pub async fn get(&self, student: &StudentId, course: &CourseId) -> Option<Pathway> {
        let key = (student.clone(), course.clone());
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if !self.is_expired(entry, now) => return Some(entry.pathway.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Re-check under the write lock; a fresh insert may have raced in
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some(entry) if !self.is_expired(entry, now) => Some(entry.pathway.clone()),
            Some(_) => {
                entries.remove(&key);
                debug!(%student, %course, "evicted expired pathway");
                None
            }
            None => None,
        }
    }

    /// Insert or replace the pathway for its student and course.
    pub async fn insert(&self, pathway: Pathway) {
        let key = (pathway.student_id.clone(), pathway.course_id.clone());
        let entry = CacheEntry { pathway, inserted_at: self.clock.now() };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop one entry. Returns whether it existed.
    pub async fn invalidate(&self, student: &StudentId, course: &CourseId) -> bool {
        self.entries
            .write()
            .await
            .remove(&(student.clone(), course.clone()))
            .is_some()
    }

    /// Drop every entry of a student. Returns how many were dropped.
    pub async fn invalidate_student(&self, student: &StudentId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(s, _), _| s != student);
        before - entries.len()
    }

    /// Evict every expired entry. Returns how many were evicted.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.inserted_at < self.ttl);
        before - entries.len()
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpath_core::{Difficulty, LearningStyle, ManualClock, PathwayId, PathwayMetadata};

    fn pathway(student: &str, course: &str) -> Pathway {
        Pathway {
            id: PathwayId::new(),
            student_id: StudentId::from(student),
            course_id: CourseId::from(course),
            steps: Vec::new(),
            metadata: PathwayMetadata {
                difficulty: Difficulty::Beginner,
                learning_style: LearningStyle::Reading,
                estimated_total_minutes: 0,
            },
            created_at: chrono::Utc::now(),
        }
    }

    fn cache() -> (PathwayCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        (PathwayCache::new(Duration::from_secs(60), clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_hit_then_expire() {
        let (cache, clock) = cache();
        let stored = pathway("s1", "c1");
        cache.insert(stored.clone()).await;

        let hit = cache.get(&StudentId::from("s1"), &CourseId::from("c1")).await;
        assert_eq!(hit.map(|p| p.id), Some(stored.id));

        clock.advance(chrono::Duration::seconds(60));
        assert!(cache.get(&StudentId::from("s1"), &CourseId::from("c1")).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_student() {
        let (cache, _) = cache();
        cache.insert(pathway("s1", "c1")).await;
        cache.insert(pathway("s1", "c2")).await;
        cache.insert(pathway("s2", "c1")).await;

        assert_eq!(cache.invalidate_student(&StudentId::from("s1")).await, 2);
        assert_eq!(cache.len().await, 1);
        assert!(cache.invalidate(&StudentId::from("s2"), &CourseId::from("c1")).await);
        assert!(!cache.invalidate(&StudentId::from("s2"), &CourseId::from("c1")).await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, clock) = cache();
        cache.insert(pathway("s1", "c1")).await;
        clock.advance(chrono::Duration::seconds(30));
        cache.insert(pathway("s2", "c1")).await;
        clock.advance(chrono::Duration::seconds(40));

        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.get(&StudentId::from("s2"), &CourseId::from("c1")).await.is_some());
    }
}
