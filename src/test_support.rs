// src/test_support.rs
//
// Doubles and fixtures shared by unit and integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::{
    config::{FeedbackBands, ScoringRules},
    error::AiError,
    models::{
        answer::Answer,
        progress::UserProgress,
        question::{Difficulty, Question},
        quiz::Quiz,
    },
    quiz::{
        cache::QuestionCache,
        feedback::{Feedback, FeedbackContext, FeedbackGenerator, QuestionGenerator},
        session::{QuizSession, QuizSettings, SessionDeps},
    },
    repositories::{QuestionStore, ResultStore, SqliteQuestionStore, SqliteResultStore},
    utils::clock::Clock,
};

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let (Ok(mut now), Ok(by)) = (self.now.lock(), chrono::Duration::from_std(by)) {
            *now += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}

/// `n` four-option questions whose correct option is index 1 ("B"), each
/// with a single hint.
pub fn sample_questions(subject: &str, difficulty: Difficulty, n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| {
            Question::multiple_choice(
                subject,
                difficulty,
                &format!("{} câu {}", subject, i + 1),
                vec!["A".into(), "B".into(), "C".into(), "D".into()],
                1,
                "B là đáp án đúng",
            )
            .with_hints(vec![format!("Gợi ý cho câu {}", i + 1)])
        })
        .collect()
}

pub fn settings(subject: &str, difficulty: Difficulty, question_count: usize) -> QuizSettings {
    QuizSettings {
        subject: subject.to_string(),
        difficulty,
        question_count,
        time_limit: Duration::from_secs(15 * 60),
        user_id: None,
    }
}

/// Single-connection in-memory database with migrations applied.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Generator that fabricates sample questions, or fails on demand.
#[derive(Default)]
pub struct StubQuestionGenerator {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl StubQuestionGenerator {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for StubQuestionGenerator {
    async fn generate_questions(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AiError::NotConfigured);
        }
        Ok(sample_questions(subject, difficulty, count)
            .into_iter()
            .map(|q| q.with_source("ai"))
            .collect())
    }
}

/// Feedback generator returning canned text and remembering what it was
/// asked, or failing on demand.
#[derive(Default)]
pub struct StubFeedbackGenerator {
    failing: AtomicBool,
    calls: AtomicUsize,
    last: Mutex<Option<FeedbackContext>>,
}

impl StubFeedbackGenerator {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<FeedbackContext> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[async_trait]
impl FeedbackGenerator for StubFeedbackGenerator {
    async fn generate_feedback(&self, context: &FeedbackContext) -> Result<Feedback, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(context.clone());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AiError::NotConfigured);
        }
        Ok(Feedback {
            text: format!("Bạn trả lời đúng {}/{} câu.", context.correct, context.total),
            suggestions: vec!["Tiếp tục luyện tập".to_string()],
        })
    }
}

/// SQLite result store whose next `n` saves fail.
pub struct FlakyResultStore {
    inner: SqliteResultStore,
    failures_left: AtomicUsize,
    save_calls: AtomicUsize,
}

impl FlakyResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: SqliteResultStore::new(pool),
            failures_left: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of quizzes actually stored.
    pub async fn saved_count(&self) -> usize {
        self.inner.recent_quizzes(i64::MAX).await.map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ResultStore for FlakyResultStore {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<i64, sqlx::Error> {
        self.inner.insert_quiz(quiz).await
    }

    async fn insert_answers(&self, answers: &[Answer]) -> Result<(), sqlx::Error> {
        self.inner.insert_answers(answers).await
    }

    async fn save_completed(&self, quiz: &Quiz, answers: &[Answer]) -> Result<i64, sqlx::Error> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.inner.save_completed(quiz, answers).await
    }

    async fn quiz_by_id(&self, id: i64) -> Result<Option<Quiz>, sqlx::Error> {
        self.inner.quiz_by_id(id).await
    }

    async fn answers_by_quiz(&self, quiz_id: i64) -> Result<Vec<Answer>, sqlx::Error> {
        self.inner.answers_by_quiz(quiz_id).await
    }

    async fn top_scores(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        self.inner.top_scores(limit).await
    }

    async fn average_score(&self, subject: &str) -> Result<Option<f64>, sqlx::Error> {
        self.inner.average_score(subject).await
    }

    async fn recent_quizzes(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        self.inner.recent_quizzes(limit).await
    }

    async fn recent_quizzes_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        self.inner.recent_quizzes_for_user(user_id, limit).await
    }

    async fn mark_synced(&self, id: i64) -> Result<bool, sqlx::Error> {
        self.inner.mark_synced(id).await
    }

    async fn user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, sqlx::Error> {
        self.inner.user_progress(user_id).await
    }
}

/// A full set of session collaborators over an in-memory database.
pub struct TestHarness {
    pub pool: SqlitePool,
    pub question_store: Arc<SqliteQuestionStore>,
    pub results: Arc<FlakyResultStore>,
    pub generator: Arc<StubQuestionGenerator>,
    pub feedback: Arc<StubFeedbackGenerator>,
    pub cache: Arc<QuestionCache>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let pool = memory_pool().await;
        let clock = Arc::new(ManualClock::new());
        Self {
            question_store: Arc::new(SqliteQuestionStore::new(pool.clone())),
            results: Arc::new(FlakyResultStore::new(pool.clone())),
            generator: Arc::new(StubQuestionGenerator::default()),
            feedback: Arc::new(StubFeedbackGenerator::default()),
            cache: Arc::new(QuestionCache::new(Duration::from_secs(24 * 60 * 60), clock.clone())),
            clock,
            pool,
        }
    }

    pub async fn seed(&self, questions: Vec<Question>) {
        self.question_store
            .insert(&questions)
            .await
            .expect("Failed to seed questions");
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            questions: self.question_store.clone(),
            results: self.results.clone(),
            generator: self.generator.clone(),
            feedback: self.feedback.clone(),
            cache: self.cache.clone(),
            clock: self.clock.clone(),
            scoring: ScoringRules::default(),
            bands: FeedbackBands::default(),
        }
    }

    pub fn session(&self) -> QuizSession {
        self.deps().new_session()
    }
}
