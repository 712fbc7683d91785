// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// What the user picked for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Position in the question's option list.
    Index(usize),
    /// Free-text entry.
    Text(String),
}

/// Self-reported confidence, 1 (very low) to 5 (very high).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    pub fn level(&self) -> i64 {
        match self {
            Confidence::VeryLow => 1,
            Confidence::Low => 2,
            Confidence::Medium => 3,
            Confidence::High => 4,
            Confidence::VeryHigh => 5,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Confidence::VeryLow),
            2 => Some(Confidence::Low),
            3 => Some(Confidence::Medium),
            4 => Some(Confidence::High),
            5 => Some(Confidence::VeryHigh),
            _ => None,
        }
    }

    pub fn is_high(&self) -> bool {
        matches!(self, Confidence::High | Confidence::VeryHigh)
    }
}

/// A recorded answer to one question of a quiz.
///
/// `selection` is `None` when the question was skipped or the timer ran out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Set once the owning quiz has been persisted.
    pub quiz_id: Option<i64>,
    pub question_id: String,
    pub selection: Option<Selection>,
    pub is_correct: bool,
    pub time_spent_ms: u64,
    pub hints_used: u32,
    pub confidence: Option<Confidence>,
    pub answered_at: DateTime<Utc>,
}

/// Row shape of the `quiz_answers` table.
#[derive(Debug, FromRow)]
pub(crate) struct AnswerRow {
    pub quiz_id: i64,
    pub question_id: String,
    pub selected_index: Option<i64>,
    pub selected_text: Option<String>,
    pub is_correct: bool,
    pub time_spent_ms: i64,
    pub hints_used: i64,
    pub confidence: Option<i64>,
    pub answered_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        let selection = match (row.selected_index, row.selected_text) {
            (Some(i), _) if i >= 0 => Some(Selection::Index(i as usize)),
            (_, Some(text)) => Some(Selection::Text(text)),
            _ => None,
        };

        Answer {
            quiz_id: Some(row.quiz_id),
            question_id: row.question_id,
            selection,
            is_correct: row.is_correct,
            time_spent_ms: row.time_spent_ms.max(0) as u64,
            hints_used: row.hints_used.max(0) as u32,
            confidence: row.confidence.and_then(Confidence::from_level),
            answered_at: row.answered_at,
        }
    }
}

/// Payload for submitting an answer to the current question.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub selection: Selection,
    pub confidence: Option<Confidence>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels_round_trip() {
        for level in 1..=5 {
            let confidence = Confidence::from_level(level).unwrap();
            assert_eq!(confidence.level(), level);
        }
        assert_eq!(Confidence::from_level(0), None);
        assert!(Confidence::VeryHigh.is_high());
        assert!(!Confidence::Medium.is_high());
    }

    #[test]
    fn test_selection_json_shape() {
        let index: Selection = serde_json::from_str(r#"{"index": 2}"#).unwrap();
        assert_eq!(index, Selection::Index(2));

        let text: Selection = serde_json::from_str(r#"{"text": "Hà Nội"}"#).unwrap();
        assert_eq!(text, Selection::Text("Hà Nội".to_string()));
    }

    #[test]
    fn test_row_without_selection_is_empty_answer() {
        let row = AnswerRow {
            quiz_id: 7,
            question_id: "q1".to_string(),
            selected_index: None,
            selected_text: None,
            is_correct: false,
            time_spent_ms: 1200,
            hints_used: 0,
            confidence: None,
            answered_at: Utc::now(),
        };

        let answer = Answer::from(row);
        assert_eq!(answer.quiz_id, Some(7));
        assert_eq!(answer.selection, None);
        assert!(!answer.is_correct);
    }
}
