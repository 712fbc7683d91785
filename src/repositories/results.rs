// src/repositories/results.rs

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::models::{
    answer::{Answer, AnswerRow, Selection},
    progress::{UserProgress, UserProgressRow, xp_gained},
    quiz::{Quiz, QuizRow},
};

pub(crate) const QUIZ_COLUMNS: &str = "\
    id, user_id, subject, difficulty, question_ids, total_questions, correct_answers, points, \
    speed_bonus, confidence_bonus, no_hint_bonus, time_limit_secs, time_spent_ms, feedback, \
    suggestions, started_at, completed_at, is_synced";

pub(crate) const ANSWER_COLUMNS: &str = "\
    quiz_id, question_id, selected_index, selected_text, is_correct, time_spent_ms, \
    hints_used, confidence, answered_at";

/// Persistence for completed quizzes and their answers.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Inserts a quiz row and returns its new id.
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<i64, sqlx::Error>;

    /// Inserts answers. Each answer must carry its quiz id.
    async fn insert_answers(&self, answers: &[Answer]) -> Result<(), sqlx::Error>;

    /// Writes a quiz, all of its answers and, for a quiz with an owner, the
    /// owner's progress atomically. Nothing is stored if any write fails.
    async fn save_completed(&self, quiz: &Quiz, answers: &[Answer]) -> Result<i64, sqlx::Error>;

    async fn quiz_by_id(&self, id: i64) -> Result<Option<Quiz>, sqlx::Error>;

    async fn answers_by_quiz(&self, quiz_id: i64) -> Result<Vec<Answer>, sqlx::Error>;

    /// Highest scoring quizzes by percentage, then points.
    async fn top_scores(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error>;

    /// Average percentage for a subject, `None` when it has no quizzes.
    async fn average_score(&self, subject: &str) -> Result<Option<f64>, sqlx::Error>;

    async fn recent_quizzes(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error>;

    /// Latest completed quizzes of one user, newest first.
    async fn recent_quizzes_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Quiz>, sqlx::Error>;

    /// Flags a quiz as synced. Returns false if no such quiz exists.
    async fn mark_synced(&self, id: i64) -> Result<bool, sqlx::Error>;

    /// Running totals of a user, `None` before their first saved quiz.
    async fn user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteResultStore {
    pool: SqlitePool,
}

impl SqliteResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode_quizzes(rows: Vec<QuizRow>) -> Result<Vec<Quiz>, sqlx::Error> {
    rows.into_iter()
        .map(|row| Quiz::try_from(row).map_err(|e| sqlx::Error::Decode(e.into())))
        .collect()
}

fn encode_list(list: &[String]) -> Result<String, sqlx::Error> {
    serde_json::to_string(list).map_err(|e| sqlx::Error::Encode(e.into()))
}

async fn insert_quiz_tx(tx: &mut Transaction<'_, Sqlite>, quiz: &Quiz) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO quizzes (
            user_id, subject, difficulty, question_ids, total_questions, correct_answers, points,
            speed_bonus, confidence_bonus, no_hint_bonus, time_limit_secs, time_spent_ms,
            feedback, suggestions, started_at, completed_at, is_synced
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&quiz.user_id)
    .bind(&quiz.subject)
    .bind(quiz.difficulty.as_str())
    .bind(encode_list(&quiz.question_ids)?)
    .bind(quiz.score.total as i64)
    .bind(quiz.score.correct as i64)
    .bind(quiz.score.points as i64)
    .bind(quiz.score.bonuses.speed)
    .bind(quiz.score.bonuses.confidence)
    .bind(quiz.score.bonuses.no_hint)
    .bind(quiz.time_limit_secs as i64)
    .bind(quiz.time_spent_ms as i64)
    .bind(&quiz.feedback)
    .bind(encode_list(&quiz.suggestions)?)
    .bind(quiz.started_at)
    .bind(quiz.completed_at)
    .bind(quiz.is_synced)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

async fn insert_answer_tx(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    answer: &Answer,
) -> Result<(), sqlx::Error> {
    let (selected_index, selected_text) = match &answer.selection {
        Some(Selection::Index(i)) => (Some(*i as i64), None),
        Some(Selection::Text(text)) => (None, Some(text.as_str())),
        None => (None, None),
    };

    sqlx::query(&format!(
        "INSERT INTO quiz_answers ({ANSWER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(quiz_id)
    .bind(&answer.question_id)
    .bind(selected_index)
    .bind(selected_text)
    .bind(answer.is_correct)
    .bind(answer.time_spent_ms as i64)
    .bind(answer.hints_used as i64)
    .bind(answer.confidence.map(|c| c.level()))
    .bind(answer.answered_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Adds a saved quiz to its owner's totals.
async fn add_progress_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    quiz: &Quiz,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_progress (
            user_id, total_quizzes, total_questions, total_correct, total_time_ms, total_xp,
            last_active_at
        ) VALUES (?, 1, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            total_quizzes = total_quizzes + 1,
            total_questions = total_questions + excluded.total_questions,
            total_correct = total_correct + excluded.total_correct,
            total_time_ms = total_time_ms + excluded.total_time_ms,
            total_xp = total_xp + excluded.total_xp,
            last_active_at = excluded.last_active_at",
    )
    .bind(user_id)
    .bind(quiz.score.total as i64)
    .bind(quiz.score.correct as i64)
    .bind(quiz.time_spent_ms as i64)
    .bind(xp_gained(quiz.difficulty, quiz.score.correct) as i64)
    .bind(quiz.completed_at.unwrap_or(quiz.started_at))
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let id = insert_quiz_tx(&mut tx, quiz).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn insert_answers(&self, answers: &[Answer]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for answer in answers {
            let quiz_id = answer.quiz_id.ok_or_else(|| {
                sqlx::Error::Protocol(format!("answer for {} has no quiz id", answer.question_id))
            })?;
            insert_answer_tx(&mut tx, quiz_id, answer).await?;
        }
        tx.commit().await
    }

    async fn save_completed(&self, quiz: &Quiz, answers: &[Answer]) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let id = insert_quiz_tx(&mut tx, quiz).await?;
        for answer in answers {
            insert_answer_tx(&mut tx, id, answer).await?;
        }
        if let Some(user_id) = &quiz.user_id {
            add_progress_tx(&mut tx, user_id, quiz).await?;
        }
        tx.commit().await?;
        Ok(id)
    }

    async fn quiz_by_id(&self, id: i64) -> Result<Option<Quiz>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(decode_quizzes(vec![row])?.pop()),
            None => Ok(None),
        }
    }

    async fn answers_by_quiz(&self, quiz_id: i64) -> Result<Vec<Answer>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AnswerRow>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM quiz_answers WHERE quiz_id = ? ORDER BY id"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Answer::from).collect())
    }

    async fn top_scores(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS}
             FROM quizzes
             WHERE completed_at IS NOT NULL
             ORDER BY (CAST(correct_answers AS REAL) / MAX(total_questions, 1)) DESC, points DESC
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        decode_quizzes(rows)
    }

    async fn average_score(&self, subject: &str) -> Result<Option<f64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(CAST(correct_answers AS REAL) * 100.0 / total_questions)
             FROM quizzes
             WHERE subject = ? AND total_questions > 0",
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await
    }

    async fn recent_quizzes(&self, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS}
             FROM quizzes
             WHERE completed_at IS NOT NULL
             ORDER BY completed_at DESC
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        decode_quizzes(rows)
    }

    async fn recent_quizzes_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Quiz>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {QUIZ_COLUMNS}
             FROM quizzes
             WHERE user_id = ? AND completed_at IS NOT NULL
             ORDER BY completed_at DESC
             LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        decode_quizzes(rows)
    }

    async fn mark_synced(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE quizzes SET is_synced = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_progress(&self, user_id: &str) -> Result<Option<UserProgress>, sqlx::Error> {
        let row = sqlx::query_as::<_, UserProgressRow>(
            "SELECT user_id, total_quizzes, total_questions, total_correct, total_time_ms,
                    total_xp, last_active_at
             FROM user_progress
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProgress::from))
    }
}
