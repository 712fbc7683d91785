// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{questions, quiz, subjects, users},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Quiz sessions and stored results under `/api/quiz`.
/// * Subject overview under `/api/subjects`.
/// * Question bank maintenance under `/api/questions`.
/// * Per-user progress under `/api/users`.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let session_routes = Router::new()
        .route("/", post(quiz::start_quiz))
        .route("/{id}", get(quiz::get_session).delete(quiz::abandon))
        .route("/{id}/answer", post(quiz::submit_answer))
        .route("/{id}/hint", post(quiz::reveal_hint))
        .route("/{id}/advance", post(quiz::advance))
        .route("/{id}/retry", post(quiz::retry_save));

    let quiz_routes = Router::new()
        .nest("/sessions", session_routes)
        .route("/results/{id}", get(quiz::get_result))
        .route("/results/{id}/synced", post(quiz::mark_synced))
        .route("/leaderboard", get(quiz::get_leaderboard))
        .route("/statistics", get(quiz::get_statistics));

    let subject_routes = Router::new()
        .route("/", get(subjects::list_subjects))
        .route("/{subject}", get(subjects::get_subject));

    let question_routes = Router::new()
        .route("/", post(questions::create_question))
        .route("/{id}", delete(questions::delete_question));

    let user_routes = Router::new()
        .route("/{user_id}/progress", get(users::get_progress))
        .route("/{user_id}/statistics", get(users::get_user_statistics));

    Router::new()
        .nest("/api/quiz", quiz_routes)
        .nest("/api/subjects", subject_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/users", user_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
