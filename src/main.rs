// src/main.rs

use smart_quiz::config::Config;
use smart_quiz::routes;
use smart_quiz::seed::seed_sample_questions;
use smart_quiz::state::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How often finished sessions are swept, and how long they are kept.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);
const SESSION_MAX_AGE: Duration = Duration::from_secs(2 * 60 * 60);

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env().expect("Invalid configuration");

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to open database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let state = AppState::new(pool.clone(), config.clone()).expect("Failed to build HTTP client");

    if config.seed_sample_data {
        if let Err(e) = seed_sample_questions(state.questions().as_ref()).await {
            tracing::error!("Failed to seed sample questions: {:?}", e);
        }
    }

    let _pruner = state.sessions.spawn_pruner(
        state.deps.clock.clone(),
        SESSION_PRUNE_INTERVAL,
        SESSION_MAX_AGE,
    );

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
