// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use sqlx::FromRow;

use crate::models::{answer::Answer, question::Difficulty};

/// Which bonuses a score earned. Each one is triggered independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonuses {
    pub speed: bool,
    pub confidence: bool,
    pub no_hint: bool,
}

/// Outcome of a quiz.
///
/// The percentage is always derived from `correct` and `total`; it is only
/// rounded when displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
    /// Base points plus bonuses.
    pub points: u32,
    pub bonuses: Bonuses,
}

impl Score {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }

    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage())
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Score", 6)?;
        s.serialize_field("correct", &self.correct)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("points", &self.points)?;
        s.serialize_field("bonuses", &self.bonuses)?;
        s.serialize_field("percentage", &self.percentage())?;
        s.serialize_field("grade", &self.grade())?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 95.0 => Grade::APlus,
            p if p >= 85.0 => Grade::A,
            p if p >= 70.0 => Grade::B,
            p if p >= 55.0 => Grade::C,
            p if p >= 40.0 => Grade::D,
            _ => Grade::F,
        }
    }
}

/// A quiz attempt as stored in the result store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    /// Assigned by the result store on insert.
    pub id: Option<i64>,
    pub user_id: Option<String>,
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_ids: Vec<String>,
    pub time_limit_secs: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Score,
    pub time_spent_ms: u64,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
    pub is_synced: bool,
}

impl Quiz {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Row shape of the `quizzes` table.
#[derive(Debug, FromRow)]
pub(crate) struct QuizRow {
    pub id: i64,
    pub user_id: Option<String>,
    pub subject: String,
    pub difficulty: String,
    pub question_ids: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub points: i64,
    pub speed_bonus: bool,
    pub confidence_bonus: bool,
    pub no_hint_bonus: bool,
    pub time_limit_secs: i64,
    pub time_spent_ms: i64,
    pub feedback: Option<String>,
    pub suggestions: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_synced: bool,
}

impl TryFrom<QuizRow> for Quiz {
    type Error = String;

    fn try_from(row: QuizRow) -> Result<Self, Self::Error> {
        let question_ids: Vec<String> =
            serde_json::from_str(&row.question_ids).map_err(|e| format!("quiz {}: {}", row.id, e))?;
        let suggestions: Vec<String> =
            serde_json::from_str(&row.suggestions).map_err(|e| format!("quiz {}: {}", row.id, e))?;

        Ok(Quiz {
            id: Some(row.id),
            user_id: row.user_id,
            subject: row.subject,
            difficulty: row.difficulty.parse()?,
            question_ids,
            time_limit_secs: row.time_limit_secs.max(0) as u64,
            started_at: row.started_at,
            completed_at: row.completed_at,
            score: Score {
                correct: row.correct_answers.max(0) as u32,
                total: row.total_questions.max(0) as u32,
                points: row.points.max(0) as u32,
                bonuses: Bonuses {
                    speed: row.speed_bonus,
                    confidence: row.confidence_bonus,
                    no_hint: row.no_hint_bonus,
                },
            },
            time_spent_ms: row.time_spent_ms.max(0) as u64,
            feedback: row.feedback,
            suggestions,
            is_synced: row.is_synced,
        })
    }
}

/// A completed quiz together with its per-question answers.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    pub quiz: Quiz,
    pub answers: Vec<Answer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_is_derived() {
        let score = Score { correct: 3, total: 4, points: 30, bonuses: Bonuses::default() };
        assert_eq!(score.percentage(), 75.0);
        assert_eq!(score.grade(), Grade::B);
    }

    #[test]
    fn test_percentage_zero_total() {
        let score = Score::default();
        assert_eq!(score.percentage(), 0.0);
        assert_eq!(score.grade(), Grade::F);
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_percentage(95.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(94.9), Grade::A);
        assert_eq!(Grade::from_percentage(55.0), Grade::C);
        assert_eq!(Grade::from_percentage(39.9), Grade::F);
    }

    #[test]
    fn test_score_serializes_percentage() {
        let score = Score { correct: 1, total: 2, points: 10, bonuses: Bonuses::default() };
        let json = serde_json::to_value(score).unwrap();
        assert_eq!(json["percentage"], 50.0);
        assert_eq!(json["grade"], "D");
    }
}
