// src/quiz/cache.rs

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    models::question::{Difficulty, Question},
    utils::clock::Clock,
};

struct CacheEntry {
    stored_at: DateTime<Utc>,
    questions: Vec<Question>,
}

/// Generated questions keyed by subject and difficulty, dropped after a
/// fixed time-to-live.
pub struct QuestionCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<(String, Difficulty), CacheEntry>>,
}

impl QuestionCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn entries(&self) -> RwLockWriteGuard<'_, HashMap<(String, Difficulty), CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached questions for the key and restarts its TTL.
    pub fn put(&self, subject: &str, difficulty: Difficulty, questions: Vec<Question>) {
        let entry = CacheEntry {
            stored_at: self.clock.now(),
            questions,
        };
        self.entries().insert((subject.to_string(), difficulty), entry);
    }

    /// Cached questions, or `None` if absent or expired. Expired entries are
    /// removed.
    pub fn get(&self, subject: &str, difficulty: Difficulty) -> Option<Vec<Question>> {
        let key = (subject.to_string(), difficulty);
        let now = self.clock.now();

        let mut entries = self.entries();
        let expired = match entries.get(&key) {
            Some(entry) => (now - entry.stored_at)
                .to_std()
                .is_ok_and(|age| age > self.ttl),
            None => return None,
        };

        if expired {
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|entry| entry.questions.clone())
    }

    pub fn clear(&self, subject: &str, difficulty: Difficulty) {
        self.entries().remove(&(subject.to_string(), difficulty));
    }

    pub fn clear_all(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
