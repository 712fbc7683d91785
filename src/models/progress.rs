// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::question::Difficulty;

/// XP per correct answer in tenths, so `Easy` (x1.2) stays exact.
fn xp_tenths_per_correct(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 12,
        Difficulty::Medium => 15,
        Difficulty::Hard => 20,
    }
}

/// Experience for a completed quiz: 10 per correct answer scaled by the
/// difficulty multiplier.
pub fn xp_gained(difficulty: Difficulty, correct: u32) -> u32 {
    correct * xp_tenths_per_correct(difficulty)
}

/// Running totals for one user, updated with every saved quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    pub user_id: String,
    pub total_quizzes: u32,
    pub total_questions: u32,
    pub total_correct: u32,
    pub total_time_spent_ms: u64,
    pub total_xp: u32,
    pub last_active_at: DateTime<Utc>,
}

impl UserProgress {
    /// Correct answers over all questions ever answered, as a percentage.
    pub fn average_accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.total_correct as f64 / self.total_questions as f64 * 100.0
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UserProgressRow {
    pub user_id: String,
    pub total_quizzes: i64,
    pub total_questions: i64,
    pub total_correct: i64,
    pub total_time_ms: i64,
    pub total_xp: i64,
    pub last_active_at: DateTime<Utc>,
}

impl From<UserProgressRow> for UserProgress {
    fn from(row: UserProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            total_quizzes: row.total_quizzes.max(0) as u32,
            total_questions: row.total_questions.max(0) as u32,
            total_correct: row.total_correct.max(0) as u32,
            total_time_spent_ms: row.total_time_ms.max(0) as u64,
            total_xp: row.total_xp.max(0) as u32,
            last_active_at: row.last_active_at,
        }
    }
}
