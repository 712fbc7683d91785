// src/quiz/session.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    config::{
        FeedbackBands, MAX_QUESTIONS_PER_QUIZ, MAX_QUIZ_TIME_MINUTES, MIN_QUESTIONS_PER_QUIZ,
        MIN_QUIZ_TIME_MINUTES, ScoringRules,
    },
    error::QuizError,
    models::{
        answer::{Answer, Confidence, Selection},
        progress::xp_gained,
        question::{Difficulty, PublicQuestion, Question},
        quiz::{Quiz, Score},
    },
    quiz::{
        cache::QuestionCache,
        feedback::{FeedbackContext, FeedbackGenerator, QuestionGenerator, WrongAnswer, feedback_or_fallback},
        scoring,
    },
    repositories::{QuestionStore, ResultStore},
    utils::{clock::Clock, resource::Resource},
};

/// Collaborators a session talks to. Cheap to clone; one set is shared by
/// every session of the service.
#[derive(Clone)]
pub struct SessionDeps {
    pub questions: Arc<dyn QuestionStore>,
    pub results: Arc<dyn ResultStore>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub feedback: Arc<dyn FeedbackGenerator>,
    pub cache: Arc<QuestionCache>,
    pub clock: Arc<dyn Clock>,
    pub scoring: ScoringRules,
    pub bands: FeedbackBands,
}

impl SessionDeps {
    pub fn new_session(&self) -> QuizSession {
        QuizSession::new(self.clone())
    }
}

/// Parameters of a quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSettings {
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub time_limit: Duration,
    pub user_id: Option<String>,
}

impl QuizSettings {
    fn validate(&self) -> Result<(), QuizError> {
        if self.subject.trim().is_empty() {
            return Err(QuizError::InvalidInput("Subject is required".to_string()));
        }
        if !(MIN_QUESTIONS_PER_QUIZ..=MAX_QUESTIONS_PER_QUIZ).contains(&self.question_count) {
            return Err(QuizError::InvalidInput(format!(
                "Question count must be between {} and {}",
                MIN_QUESTIONS_PER_QUIZ, MAX_QUESTIONS_PER_QUIZ
            )));
        }
        let min = Duration::from_secs(MIN_QUIZ_TIME_MINUTES * 60);
        let max = Duration::from_secs(MAX_QUIZ_TIME_MINUTES * 60);
        if self.time_limit < min || self.time_limit > max {
            return Err(QuizError::InvalidInput(format!(
                "Time limit must be between {} and {} minutes",
                MIN_QUIZ_TIME_MINUTES, MAX_QUIZ_TIME_MINUTES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress { index: usize },
    Completed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::NotStarted => "not started",
            SessionState::InProgress { .. } => "in progress",
            SessionState::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
struct AnswerDraft {
    selection: Option<Selection>,
    confidence: Option<Confidence>,
    time_spent_ms: u64,
    answered_at: DateTime<Utc>,
}

/// A finished quiz and its answers, saved or waiting to be saved.
#[derive(Debug, Clone)]
pub struct CompletedQuiz {
    pub quiz: Quiz,
    pub answers: Vec<Answer>,
}

/// What the client is shown once the quiz is over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizOutcome {
    /// `None` until the result store accepted the quiz.
    pub quiz_id: Option<i64>,
    pub score: Score,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
    /// Experience credited to the quiz owner, `None` for anonymous quizzes.
    pub xp_gained: Option<u32>,
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub total_questions: usize,
    pub answered: usize,
    pub current_question: Option<PublicQuestion>,
    pub current_selection: Option<Selection>,
    pub hints_used: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub submission: Option<Resource<QuizOutcome>>,
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

fn selection_label(question: &Question, selection: &Selection) -> String {
    match selection {
        Selection::Index(i) => question
            .options
            .get(*i)
            .cloned()
            .unwrap_or_else(|| format!("#{}", i)),
        Selection::Text(text) => text.clone(),
    }
}

/// One quiz attempt: `NotStarted -> InProgress(index) -> Completed`.
///
/// Transitions happen only after the collaborator calls they depend on have
/// resolved. Every change is published to subscribers.
pub struct QuizSession {
    deps: SessionDeps,
    state: SessionState,
    settings: Option<QuizSettings>,
    questions: Vec<Question>,
    drafts: HashMap<String, AnswerDraft>,
    hints_used: HashMap<String, u32>,
    started_at: Option<DateTime<Utc>>,
    shown_at: DateTime<Utc>,
    completed: Option<CompletedQuiz>,
    submission: Option<Resource<QuizOutcome>>,
    updates: watch::Sender<SessionSnapshot>,
}

impl QuizSession {
    pub fn new(deps: SessionDeps) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        let shown_at = deps.clock.now();
        Self {
            deps,
            state: SessionState::NotStarted,
            settings: None,
            questions: Vec::new(),
            drafts: HashMap::new(),
            hints_used: HashMap::new(),
            started_at: None,
            shown_at,
            completed: None,
            submission: None,
            updates,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> Option<&QuizSettings> {
        self.settings.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Receives a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Loads questions and moves to the first one.
    ///
    /// Short stores are topped up by the generator; generated questions are
    /// persisted and cached. If generation fails, cached questions are used,
    /// then whatever the store had.
    pub async fn start(&mut self, settings: QuizSettings) -> Result<(), QuizError> {
        if self.state != SessionState::NotStarted {
            return Err(QuizError::InvalidState(self.state.name()));
        }
        settings.validate()?;

        let count = settings.question_count;
        let mut questions = self
            .deps
            .questions
            .random_questions(&settings.subject, settings.difficulty, count)
            .await
            .map_err(|e| QuizError::Storage(e.to_string()))?;

        if questions.len() < count {
            let missing = count - questions.len();
            let extra = self.supplement(&settings, &questions, missing).await;
            questions.extend(extra);
        }

        if questions.is_empty() {
            return Err(QuizError::NoQuestionsAvailable {
                subject: settings.subject.clone(),
                difficulty: settings.difficulty.to_string(),
            });
        }
        questions.truncate(count);

        let now = self.deps.clock.now();
        tracing::info!(
            subject = %settings.subject,
            difficulty = %settings.difficulty,
            requested = count,
            loaded = questions.len(),
            "Quiz started"
        );

        self.questions = questions;
        self.settings = Some(settings);
        self.drafts.clear();
        self.hints_used.clear();
        self.started_at = Some(now);
        self.shown_at = now;
        self.state = SessionState::InProgress { index: 0 };
        self.publish();
        Ok(())
    }

    async fn supplement(&self, settings: &QuizSettings, have: &[Question], missing: usize) -> Vec<Question> {
        let known: HashSet<&str> = have.iter().map(|q| q.id.as_str()).collect();
        let subject = settings.subject.as_str();

        match self
            .deps
            .generator
            .generate_questions(subject, settings.difficulty, missing)
            .await
        {
            Ok(generated) => {
                let fresh: Vec<Question> = generated
                    .into_iter()
                    .filter(|q| !known.contains(q.id.as_str()))
                    .collect();

                if !fresh.is_empty() {
                    match self.deps.questions.insert(&fresh).await {
                        Ok(added) if (added as usize) < fresh.len() => {
                            tracing::debug!(subject, added, "Some generated questions were already stored");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(subject, "Failed to store generated questions: {}", e);
                        }
                    }
                    self.deps.cache.put(subject, settings.difficulty, fresh.clone());
                }
                fresh.into_iter().take(missing).collect()
            }
            Err(e) => {
                let err = QuizError::GenerationFailure(e.to_string());
                tracing::warn!(subject, "{}; falling back to cached questions", err);

                let mut cached: Vec<Question> = self
                    .deps
                    .cache
                    .get(subject, settings.difficulty)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|q| !known.contains(q.id.as_str()))
                    .collect();
                cached.shuffle(&mut rand::thread_rng());
                cached.truncate(missing);
                cached
            }
        }
    }

    fn current_index(&self) -> Result<usize, QuizError> {
        match self.state {
            SessionState::InProgress { index } => Ok(index),
            other => Err(QuizError::InvalidState(other.name())),
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress { index } => self.questions.get(index),
            _ => None,
        }
    }

    /// Records the selection for the current question, replacing any earlier
    /// one. Time spent is measured from when the question was shown.
    pub fn submit_answer(
        &mut self,
        selection: Selection,
        confidence: Option<Confidence>,
    ) -> Result<(), QuizError> {
        let index = self.current_index()?;
        let question = &self.questions[index];

        if let Selection::Index(i) = selection {
            if i >= question.options.len() {
                return Err(QuizError::InvalidInput(format!("Option {} does not exist", i)));
            }
        }

        let question_id = question.id.clone();
        let now = self.deps.clock.now();
        self.drafts.insert(
            question_id,
            AnswerDraft {
                selection: Some(selection),
                confidence,
                time_spent_ms: elapsed_ms(self.shown_at, now),
                answered_at: now,
            },
        );
        self.publish();
        Ok(())
    }

    /// Returns the next unused hint for the current question, counting it
    /// against the no-hint bonus. `None` once hints run out.
    pub fn reveal_hint(&mut self) -> Result<Option<String>, QuizError> {
        let index = self.current_index()?;
        let question = &self.questions[index];
        let used = self.hints_used.get(&question.id).copied().unwrap_or(0);

        let Some(hint) = question.hints.get(used as usize).cloned() else {
            return Ok(None);
        };
        let question_id = question.id.clone();
        self.hints_used.insert(question_id, used + 1);
        self.publish();
        Ok(Some(hint))
    }

    /// Moves to the next question, or completes the quiz after the last one.
    /// An unanswered question is recorded as an empty answer.
    pub async fn advance(&mut self) -> Result<SessionState, QuizError> {
        let index = self.current_index()?;
        let now = self.deps.clock.now();
        self.record_unanswered(index, now);

        if index + 1 >= self.questions.len() {
            self.complete(now).await?;
        } else {
            self.state = SessionState::InProgress { index: index + 1 };
            self.shown_at = now;
            self.publish();
        }
        Ok(self.state)
    }

    /// Called when the quiz time runs out: every unanswered question gets an
    /// empty answer and the quiz completes. Returns false if the session was
    /// not in progress.
    pub async fn expire(&mut self) -> Result<bool, QuizError> {
        let SessionState::InProgress { index } = self.state else {
            return Ok(false);
        };
        let now = self.deps.clock.now();
        self.record_unanswered(index, now);

        for question in &self.questions[index + 1..] {
            self.drafts
                .entry(question.id.clone())
                .or_insert_with(|| AnswerDraft {
                    selection: None,
                    confidence: None,
                    time_spent_ms: 0,
                    answered_at: now,
                });
        }

        tracing::info!(unanswered_from = index, "Quiz time expired");
        self.complete(now).await?;
        Ok(true)
    }

    fn record_unanswered(&mut self, index: usize, now: DateTime<Utc>) {
        let time_spent_ms = elapsed_ms(self.shown_at, now);
        let question_id = self.questions[index].id.clone();
        self.drafts.entry(question_id).or_insert(AnswerDraft {
            selection: None,
            confidence: None,
            time_spent_ms,
            answered_at: now,
        });
    }

    async fn complete(&mut self, now: DateTime<Utc>) -> Result<(), QuizError> {
        let Some(settings) = self.settings.clone() else {
            return Err(QuizError::InvalidState(self.state.name()));
        };

        self.submission = Some(Resource::Loading);
        self.publish();

        let answers = self.build_answers(now);
        let score = scoring::score(&self.questions, &answers, settings.time_limit, &self.deps.scoring);
        let time_spent_ms: u64 = answers.iter().map(|a| a.time_spent_ms).sum();

        let context = FeedbackContext {
            subject: settings.subject.clone(),
            difficulty: settings.difficulty,
            total: score.total,
            correct: score.correct,
            time_spent_ms,
            wrong_answers: self.wrong_answers(&answers),
        };
        let feedback = feedback_or_fallback(self.deps.feedback.as_ref(), &context, &self.deps.bands).await;

        let quiz = Quiz {
            id: None,
            user_id: settings.user_id.clone(),
            subject: settings.subject.clone(),
            difficulty: settings.difficulty,
            question_ids: self.questions.iter().map(|q| q.id.clone()).collect(),
            time_limit_secs: settings.time_limit.as_secs(),
            started_at: self.started_at.unwrap_or(now),
            completed_at: Some(now),
            score,
            time_spent_ms,
            feedback: Some(feedback.text),
            suggestions: feedback.suggestions,
            is_synced: false,
        };

        tracing::info!(
            subject = %settings.subject,
            correct = score.correct,
            total = score.total,
            points = score.points,
            "Quiz completed"
        );

        self.state = SessionState::Completed;
        self.completed = Some(CompletedQuiz { quiz, answers });
        self.persist().await.map(|_| ())
    }

    fn build_answers(&self, now: DateTime<Utc>) -> Vec<Answer> {
        self.questions
            .iter()
            .map(|q| {
                let draft = self.drafts.get(&q.id);
                let selection = draft.and_then(|d| d.selection.clone());
                Answer {
                    quiz_id: None,
                    question_id: q.id.clone(),
                    is_correct: scoring::is_correct(q, selection.as_ref()),
                    selection,
                    time_spent_ms: draft.map_or(0, |d| d.time_spent_ms),
                    hints_used: self.hints_used.get(&q.id).copied().unwrap_or(0),
                    confidence: draft.and_then(|d| d.confidence),
                    answered_at: draft.map_or(now, |d| d.answered_at),
                }
            })
            .collect()
    }

    fn wrong_answers(&self, answers: &[Answer]) -> Vec<WrongAnswer> {
        self.questions
            .iter()
            .zip(answers)
            .filter(|(_, a)| !a.is_correct)
            .filter_map(|(q, a)| {
                let selection = a.selection.as_ref()?;
                Some(WrongAnswer {
                    question: q.text.clone(),
                    correct_answer: q.correct_answer_label(),
                    user_answer: selection_label(q, selection),
                })
            })
            .collect()
    }

    async fn persist(&mut self) -> Result<i64, QuizError> {
        let (quiz, answers) = match &self.completed {
            Some(completed) => match completed.quiz.id {
                Some(id) => return Ok(id),
                None => (completed.quiz.clone(), completed.answers.clone()),
            },
            None => return Err(QuizError::InvalidState(self.state.name())),
        };

        self.submission = Some(Resource::Loading);
        self.publish();

        match self.deps.results.save_completed(&quiz, &answers).await {
            Ok(id) => {
                if let Some(completed) = self.completed.as_mut() {
                    completed.quiz.id = Some(id);
                    for answer in &mut completed.answers {
                        answer.quiz_id = Some(id);
                    }
                }
                tracing::info!(quiz_id = id, answers = answers.len(), "Quiz saved");
                self.submission = self.outcome().map(Resource::success);
                self.publish();
                Ok(id)
            }
            Err(e) => {
                tracing::error!(subject = %quiz.subject, "Failed to save quiz: {}", e);
                let err = QuizError::PersistenceFailure(e.to_string());
                self.submission = Some(Resource::error(err.user_message(), self.outcome()));
                self.publish();
                Err(err)
            }
        }
    }

    /// Re-attempts persistence of a completed quiz whose save failed. Score
    /// and feedback are not recomputed.
    pub async fn retry_save(&mut self) -> Result<i64, QuizError> {
        if self.state != SessionState::Completed {
            return Err(QuizError::InvalidState(self.state.name()));
        }
        self.persist().await
    }

    /// Id of the stored quiz, available once completed and saved.
    pub fn completed_quiz_id(&self) -> Option<i64> {
        match self.state {
            SessionState::Completed => self.completed.as_ref().and_then(|c| c.quiz.id),
            _ => None,
        }
    }

    pub fn completed(&self) -> Option<&CompletedQuiz> {
        self.completed.as_ref()
    }

    fn outcome(&self) -> Option<QuizOutcome> {
        self.completed.as_ref().map(|c| QuizOutcome {
            quiz_id: c.quiz.id,
            score: c.quiz.score,
            feedback: c.quiz.feedback.clone(),
            suggestions: c.quiz.suggestions.clone(),
            xp_gained: c
                .quiz
                .user_id
                .as_ref()
                .map(|_| xp_gained(c.quiz.difficulty, c.quiz.score.correct)),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current = self.current_question();
        let deadline = match (self.started_at, self.settings.as_ref()) {
            (Some(started), Some(settings)) => chrono::Duration::from_std(settings.time_limit)
                .ok()
                .map(|limit| started + limit),
            _ => None,
        };

        SessionSnapshot {
            state: self.state,
            subject: self.settings.as_ref().map(|s| s.subject.clone()),
            difficulty: self.settings.as_ref().map(|s| s.difficulty),
            total_questions: self.questions.len(),
            answered: self.drafts.values().filter(|d| d.selection.is_some()).count(),
            current_question: current.map(PublicQuestion::from),
            current_selection: current
                .and_then(|q| self.drafts.get(&q.id))
                .and_then(|d| d.selection.clone()),
            hints_used: current
                .and_then(|q| self.hints_used.get(&q.id).copied())
                .unwrap_or(0),
            started_at: self.started_at,
            deadline,
            completed_at: self.completed.as_ref().and_then(|c| c.quiz.completed_at),
            submission: self.submission.clone(),
        }
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
