// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Failures of the quiz session and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// Neither the question store nor the generator produced any question.
    #[error("no questions available for {subject} ({difficulty})")]
    NoQuestionsAvailable { subject: String, difficulty: String },

    /// The question generator failed. Recoverable: the session falls back
    /// to cached or fewer questions.
    #[error("question generation failed: {0}")]
    GenerationFailure(String),

    /// The feedback generator failed. Recoverable: rule-based text is used.
    #[error("feedback unavailable: {0}")]
    FeedbackUnavailable(String),

    /// Writing the completed quiz failed. The session keeps the unsaved
    /// outcome until a retry succeeds.
    #[error("failed to persist quiz: {0}")]
    PersistenceFailure(String),

    /// Reading from a store failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("operation not allowed while session is {0}")]
    InvalidState(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl QuizError {
    /// Short message safe to show to the user.
    pub fn user_message(&self) -> String {
        match self {
            QuizError::NoQuestionsAvailable { .. } => "Không có câu hỏi nào cho chủ đề này".to_string(),
            QuizError::GenerationFailure(_) => "Không thể tạo câu hỏi mới".to_string(),
            QuizError::FeedbackUnavailable(_) => "Không thể tạo nhận xét".to_string(),
            QuizError::PersistenceFailure(_) => {
                "Không thể lưu kết quả. Vui lòng thử lại".to_string()
            }
            QuizError::Storage(_) => "Lỗi truy cập dữ liệu".to_string(),
            QuizError::InvalidState(state) => format!("Quiz is {}", state),
            QuizError::InvalidInput(msg) => msg.clone(),
        }
    }
}

/// Failures talking to the text generation service.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API key is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// The request URL is stripped so credentials never reach the logs.
impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Transport(err.without_url())
    }
}

impl From<serde_json::Error> for AiError {
    fn from(err: serde_json::Error) -> Self {
        AiError::MalformedResponse(err.to_string())
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., answering a finished quiz)
    Conflict(String),

    // 503 Service Unavailable (retryable)
    Unavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        let message = err.user_message();
        match err {
            QuizError::NoQuestionsAvailable { .. } => AppError::NotFound(message),
            QuizError::InvalidInput(_) => AppError::BadRequest(message),
            QuizError::InvalidState(_) => AppError::Conflict(message),
            QuizError::PersistenceFailure(detail) => {
                tracing::error!("Quiz persistence failed: {}", detail);
                AppError::Unavailable(message)
            }
            QuizError::GenerationFailure(detail)
            | QuizError::FeedbackUnavailable(detail)
            | QuizError::Storage(detail) => AppError::InternalServerError(detail),
        }
    }
}
