// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{error::AppError, models::question::CreateQuestionRequest, state::AppState};

/// Adds a question to the bank.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload
        .validate_answer_key()
        .map_err(|e| AppError::BadRequest(format!("Invalid answer key: {}", e.code)))?;

    let question = payload.into_question();
    state.questions().insert(std::slice::from_ref(&question)).await.map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(question_id = %question.id, subject = %question.subject, "Question created");
    Ok((StatusCode::CREATED, Json(question)))
}

/// Retires a question. Stored quizzes that used it are unaffected.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.questions().deactivate(&id).await? {
        return Err(AppError::NotFound(format!("Question {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
