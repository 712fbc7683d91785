// src/repositories/questions.rs

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::models::question::{Difficulty, Question, QuestionRow};

pub(crate) const COLUMNS: &str = "\
    id, subject, difficulty, question_type, question_text, options, correct_index, \
    correct_text, explanation, hints, tags, image_url, audio_url, source, is_active, created_at";

/// Source of question records.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Up to `limit` random active questions for the subject and difficulty.
    async fn random_questions(
        &self,
        subject: &str,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<Question>, sqlx::Error>;

    async fn all_subjects(&self) -> Result<Vec<String>, sqlx::Error>;

    async fn question_count(&self, subject: &str) -> Result<i64, sqlx::Error>;

    async fn question_by_id(&self, id: &str) -> Result<Option<Question>, sqlx::Error>;

    /// Stores new questions. Ids already present are left untouched, so a
    /// stored question never changes and a deactivated one stays retired.
    /// Returns how many rows were added.
    async fn insert(&self, questions: &[Question]) -> Result<u64, sqlx::Error>;

    /// Soft-deletes a question. Returns false if no such question exists.
    async fn deactivate(&self, id: &str) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteQuestionStore {
    pool: SqlitePool,
}

impl SqliteQuestionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode(rows: Vec<QuestionRow>) -> Result<Vec<Question>, sqlx::Error> {
    rows.into_iter()
        .map(|row| Question::try_from(row).map_err(|e| sqlx::Error::Decode(e.into())))
        .collect()
}

#[async_trait]
impl QuestionStore for SqliteQuestionStore {
    async fn random_questions(
        &self,
        subject: &str,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<Question>, sqlx::Error> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {COLUMNS}
             FROM questions
             WHERE subject = ? AND difficulty = ? AND is_active = 1
             ORDER BY RANDOM()
             LIMIT ?"
        ))
        .bind(subject)
        .bind(difficulty.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        decode(rows)
    }

    async fn all_subjects(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT subject FROM questions WHERE is_active = 1 ORDER BY subject",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn question_count(&self, subject: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM questions WHERE subject = ? AND is_active = 1",
        )
        .bind(subject)
        .fetch_one(&self.pool)
        .await
    }

    async fn question_by_id(&self, id: &str) -> Result<Option<Question>, sqlx::Error> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {COLUMNS} FROM questions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(decode(vec![row])?.pop()),
            None => Ok(None),
        }
    }

    async fn insert(&self, questions: &[Question]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;

        for q in questions {
            let result = sqlx::query(&format!(
                "INSERT INTO questions ({COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(id) DO NOTHING"
            ))
            .bind(&q.id)
            .bind(&q.subject)
            .bind(q.difficulty.as_str())
            .bind(q.question_type.as_str())
            .bind(&q.text)
            .bind(serde_json::to_string(&q.options).map_err(|e| sqlx::Error::Encode(e.into()))?)
            .bind(q.correct_index.map(|i| i as i64))
            .bind(&q.correct_text)
            .bind(&q.explanation)
            .bind(serde_json::to_string(&q.hints).map_err(|e| sqlx::Error::Encode(e.into()))?)
            .bind(serde_json::to_string(&q.tags).map_err(|e| sqlx::Error::Encode(e.into()))?)
            .bind(&q.image_url)
            .bind(&q.audio_url)
            .bind(&q.source)
            .bind(q.is_active)
            .bind(q.created_at)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected();
        }

        tx.commit().await?;
        Ok(added)
    }

    async fn deactivate(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE questions SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
