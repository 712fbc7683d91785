// src/quiz/timer.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::quiz::session::QuizSession;

pub type SharedSession = Arc<Mutex<QuizSession>>;

/// Countdown that expires a session when its time limit runs out.
///
/// Cancelling is idempotent and also happens on drop. A timer that fires
/// after the session already completed leaves it untouched.
pub struct QuizTimer {
    cancel_tx: watch::Sender<bool>,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl QuizTimer {
    pub fn start(session: SharedSession, limit: Duration) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx.changed() => {
                    tracing::debug!("Quiz timer cancelled");
                    return;
                }
                _ = sleep(limit) => {}
            }

            let mut session = session.lock().await;
            // Cancelled while waiting for the lock.
            if flag.load(Ordering::SeqCst) {
                return;
            }
            match session.expire().await {
                Ok(true) => tracing::info!("Quiz timer expired"),
                Ok(false) => {}
                Err(e) => tracing::error!("Failed to complete expired quiz: {}", e),
            }
        });

        Self {
            cancel_tx,
            cancelled,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            let _ = self.cancel_tx.send(true);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Waits for the timer task to finish without cancelling it.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Quiz timer task failed: {}", e);
            }
        }
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
