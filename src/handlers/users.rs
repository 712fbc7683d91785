// src/handlers/users.rs

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{
    error::AppError,
    models::progress::UserProgress,
    quiz::stats::{QuizStatistics, summarize},
    state::AppState,
};

/// Quizzes considered for a user's statistics.
const USER_STATISTICS_WINDOW: i64 = 30;

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub average_accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct UserStatisticsResponse {
    pub progress: ProgressResponse,
    /// Aggregates over the user's latest quizzes.
    pub recent: QuizStatistics,
}

async fn find_progress(state: &AppState, user_id: &str) -> Result<ProgressResponse, AppError> {
    let progress = state
        .results()
        .user_progress(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No quizzes saved for user '{}'", user_id)))?;

    Ok(ProgressResponse {
        average_accuracy: progress.average_accuracy(),
        progress,
    })
}

/// Lifetime totals and XP of a user.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProgressResponse>, AppError> {
    Ok(Json(find_progress(&state, &user_id).await?))
}

/// Lifetime totals plus trends over the user's recent quizzes.
pub async fn get_user_statistics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatisticsResponse>, AppError> {
    let progress = find_progress(&state, &user_id).await?;
    let quizzes = state
        .results()
        .recent_quizzes_for_user(&user_id, USER_STATISTICS_WINDOW)
        .await?;

    Ok(Json(UserStatisticsResponse {
        progress,
        recent: summarize(&quizzes),
    }))
}
