// src/quiz/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    quiz::{
        session::{QuizSession, SessionSnapshot, SessionState},
        timer::{QuizTimer, SharedSession},
    },
    utils::clock::Clock,
};

/// A live session with its update feed and countdown.
pub struct SessionEntry {
    pub session: SharedSession,
    pub updates: watch::Receiver<SessionSnapshot>,
    pub created_at: DateTime<Utc>,
    timer: Mutex<Option<QuizTimer>>,
}

impl SessionEntry {
    pub fn cancel_timer(&self) {
        let timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(timer) = timer {
            timer.cancel();
        }
    }

    pub fn latest(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }
}

/// In-memory sessions of the running service, keyed by a random id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map stays consistent across a panicking holder, so poisoning is
    // ignored rather than losing sessions.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, Arc<SessionEntry>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, Arc<SessionEntry>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a started session and arms its timer.
    pub fn insert(&self, session: QuizSession, time_limit: Option<Duration>, now: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        let updates = session.subscribe();
        let session: SharedSession = Arc::new(tokio::sync::Mutex::new(session));
        let timer = time_limit.map(|limit| QuizTimer::start(session.clone(), limit));

        let entry = Arc::new(SessionEntry {
            session,
            updates,
            created_at: now,
            timer: Mutex::new(timer),
        });
        self.write().insert(id, entry);
        tracing::debug!(session_id = %id, "Session registered");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        self.read().get(id).cloned()
    }

    /// Drops a session, cancelling its timer.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<SessionEntry>> {
        let entry = self.write().remove(id)?;
        entry.cancel_timer();
        tracing::debug!(session_id = %id, "Session removed");
        Some(entry)
    }

    /// Removes sessions that completed and were saved more than `max_age`
    /// ago, and any session older than `max_age` that never started.
    pub fn prune(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let mut sessions = self.write();

        let before = sessions.len();
        sessions.retain(|_, entry| {
            let snapshot = entry.updates.borrow();
            let stale = match snapshot.state {
                SessionState::Completed => {
                    let saved = snapshot
                        .submission
                        .as_ref()
                        .and_then(|s| s.data())
                        .is_some_and(|o| o.quiz_id.is_some());
                    saved && snapshot.completed_at.is_some_and(|at| now - at > max_age)
                }
                SessionState::NotStarted => now - entry.created_at > max_age,
                SessionState::InProgress { .. } => false,
            };
            if stale {
                entry.cancel_timer();
            }
            !stale
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Pruned finished sessions");
        }
        removed
    }

    /// Runs [`prune`](Self::prune) every `every` until the task is aborted.
    pub fn spawn_pruner(
        &self,
        clock: Arc<dyn Clock>,
        every: Duration,
        max_age: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                registry.prune(clock.now(), max_age);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
