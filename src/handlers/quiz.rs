// src/handlers/quiz.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{DEFAULT_QUESTIONS_PER_QUIZ, DEFAULT_QUIZ_TIME_MINUTES, LEADERBOARD_SIZE},
    error::AppError,
    models::{
        answer::SubmitAnswerRequest,
        question::{Difficulty, PublicQuestion},
        quiz::{QuizDetail, Score},
    },
    quiz::{
        registry::SessionEntry,
        session::{QuizSettings, SessionSnapshot, SessionState},
        stats::{QuizStatistics, summarize},
    },
    state::AppState,
};

/// Upper bound on rows read for history aggregates.
const STATISTICS_WINDOW: i64 = 1000;

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(min = 1, max = 50, message = "Subject must be between 1 and 50 characters."))]
    pub subject: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 50, message = "Question count must be between 1 and 50."))]
    pub question_count: Option<usize>,
    #[validate(range(min = 1, max = 60, message = "Time limit must be between 1 and 60 minutes."))]
    pub time_limit_minutes: Option<u64>,
    #[validate(length(max = 64))]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartQuizResponse {
    pub session_id: Uuid,
    pub time_limit_secs: u64,
    pub questions: Vec<PublicQuestion>,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub quiz_id: Option<i64>,
    pub user_id: Option<String>,
    pub subject: String,
    pub difficulty: Difficulty,
    pub score: Score,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

fn find_session(state: &AppState, id: Uuid) -> Result<Arc<SessionEntry>, AppError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))
}

/// Starts a new quiz session and arms its timer.
pub async fn start_quiz(
    State(state): State<AppState>,
    Json(payload): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let time_limit = Duration::from_secs(
        payload.time_limit_minutes.unwrap_or(DEFAULT_QUIZ_TIME_MINUTES) * 60,
    );
    let settings = QuizSettings {
        subject: payload.subject.trim().to_string(),
        difficulty: payload.difficulty,
        question_count: payload.question_count.unwrap_or(DEFAULT_QUESTIONS_PER_QUIZ),
        time_limit,
        user_id: payload.user_id.filter(|id| !id.trim().is_empty()),
    };

    let mut session = state.deps.new_session();
    session.start(settings).await?;

    let questions = session.questions().iter().map(PublicQuestion::from).collect();
    let snapshot = session.snapshot();
    let session_id = state
        .sessions
        .insert(session, Some(time_limit), state.deps.clock.now());

    tracing::info!(%session_id, "Quiz session created");

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse {
            session_id,
            time_limit_secs: time_limit.as_secs(),
            questions,
            snapshot,
        }),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_session(&state, id)?;
    Ok(Json(entry.latest()))
}

/// Records (or replaces) the answer to the current question.
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_session(&state, id)?;
    let mut session = entry.session.lock().await;
    session.submit_answer(payload.selection, payload.confidence)?;
    Ok(Json(session.snapshot()))
}

pub async fn reveal_hint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_session(&state, id)?;
    let mut session = entry.session.lock().await;
    let hint = session.reveal_hint()?;
    let snapshot = session.snapshot();
    Ok(Json(json!({
        "hint": hint,
        "hints_used": snapshot.hints_used,
    })))
}

/// Moves to the next question, completing the quiz after the last one.
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_session(&state, id)?;
    let mut session = entry.session.lock().await;

    let result = session.advance().await;
    if session.state() == SessionState::Completed {
        entry.cancel_timer();
    }
    result?;

    Ok(Json(session.snapshot()))
}

/// Retries saving a completed quiz whose first save failed.
pub async fn retry_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_session(&state, id)?;
    let mut session = entry.session.lock().await;
    session.retry_save().await?;
    Ok(Json(session.snapshot()))
}

/// Drops a session without saving anything further.
pub async fn abandon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound("Quiz session not found".to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .results()
        .quiz_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;
    let answers = state.results().answers_by_quiz(id).await?;

    Ok(Json(QuizDetail { quiz, answers }))
}

pub async fn mark_synced(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.results().mark_synced(id).await? {
        return Err(AppError::NotFound(format!("Quiz {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Best quizzes by percentage, then points.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(LEADERBOARD_SIZE).clamp(1, 100);
    let quizzes = state.results().top_scores(limit).await?;

    let leaderboard: Vec<LeaderboardEntry> = quizzes
        .into_iter()
        .enumerate()
        .map(|(i, quiz)| LeaderboardEntry {
            rank: i + 1,
            quiz_id: quiz.id,
            user_id: quiz.user_id,
            subject: quiz.subject,
            difficulty: quiz.difficulty,
            score: quiz.score,
        })
        .collect();

    Ok(Json(leaderboard))
}

pub async fn get_statistics(State(state): State<AppState>) -> Result<Json<QuizStatistics>, AppError> {
    let quizzes = state.results().recent_quizzes(STATISTICS_WINDOW).await?;
    Ok(Json(summarize(&quizzes)))
}
