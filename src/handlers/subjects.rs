// src/handlers/subjects.rs

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub question_count: i64,
    /// Average percentage over stored quizzes, `None` if none were taken.
    pub average_score: Option<f64>,
}

async fn summarize_subject(state: &AppState, subject: String) -> Result<SubjectSummary, AppError> {
    let question_count = state.questions().question_count(&subject).await?;
    let average_score = state.results().average_score(&subject).await?;
    Ok(SubjectSummary {
        subject,
        question_count,
        average_score,
    })
}

pub async fn list_subjects(State(state): State<AppState>) -> Result<Json<Vec<SubjectSummary>>, AppError> {
    let subjects = state.questions().all_subjects().await?;

    let mut summaries = Vec::with_capacity(subjects.len());
    for subject in subjects {
        summaries.push(summarize_subject(&state, subject).await?);
    }
    Ok(Json(summaries))
}

pub async fn get_subject(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<SubjectSummary>, AppError> {
    let summary = summarize_subject(&state, subject).await?;
    if summary.question_count == 0 {
        return Err(AppError::NotFound(format!("Subject '{}' has no questions", summary.subject)));
    }
    Ok(Json(summary))
}
