// src/models/question.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Closed set of difficulty levels a question or quiz can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Label used in prompts sent to the text generation service.
    pub fn display_name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "dễ",
            Difficulty::Medium => "trung bình",
            Difficulty::Hard => "khó",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillBlank => "fill_blank",
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true_false" => Ok(QuestionType::TrueFalse),
            "fill_blank" => Ok(QuestionType::FillBlank),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// A question record. Never mutated after creation; retired questions are
/// deactivated instead of deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    pub text: String,

    /// Ordered answer options. Empty for fill-in-the-blank questions.
    pub options: Vec<String>,

    /// Index of the correct option for multiple-choice and true/false questions.
    pub correct_index: Option<usize>,

    /// Expected free-text answer. For choice questions this mirrors the
    /// text of the correct option.
    pub correct_text: String,

    pub explanation: String,
    pub hints: Vec<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub source: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Question {
    /// Builds a four-option multiple-choice question with a fresh id.
    pub fn multiple_choice(
        subject: &str,
        difficulty: Difficulty,
        text: &str,
        options: Vec<String>,
        correct_index: usize,
        explanation: &str,
    ) -> Self {
        let correct_text = options.get(correct_index).cloned().unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            difficulty,
            question_type: QuestionType::MultipleChoice,
            text: text.to_string(),
            options,
            correct_index: Some(correct_index),
            correct_text,
            explanation: explanation.to_string(),
            hints: Vec::new(),
            tags: Vec::new(),
            image_url: None,
            audio_url: None,
            source: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Human-readable form of the correct answer, used in feedback prompts.
    pub fn correct_answer_label(&self) -> String {
        match self.correct_index.and_then(|i| self.options.get(i)) {
            Some(option) => option.clone(),
            None => self.correct_text.clone(),
        }
    }
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub hint_count: usize,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question_type: q.question_type,
            text: q.text.clone(),
            options: q.options.clone(),
            hint_count: q.hints.len(),
            image_url: q.image_url.clone(),
            audio_url: q.audio_url.clone(),
        }
    }
}

/// Row shape of the `questions` table. List columns are stored as JSON text.
#[derive(Debug, FromRow)]
pub(crate) struct QuestionRow {
    pub id: String,
    pub subject: String,
    pub difficulty: String,
    pub question_type: String,
    pub question_text: String,
    pub options: String,
    pub correct_index: Option<i64>,
    pub correct_text: String,
    pub explanation: String,
    pub hints: String,
    pub tags: String,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub source: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = String;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let parse_list = |raw: &str| -> Result<Vec<String>, String> {
            serde_json::from_str(raw).map_err(|e| format!("question {}: {}", row.id, e))
        };

        Ok(Question {
            difficulty: row.difficulty.parse()?,
            question_type: row.question_type.parse()?,
            options: parse_list(&row.options)?,
            hints: parse_list(&row.hints)?,
            tags: parse_list(&row.tags)?,
            correct_index: row.correct_index.and_then(|i| usize::try_from(i).ok()),
            id: row.id,
            subject: row.subject,
            text: row.question_text,
            correct_text: row.correct_text,
            explanation: row.explanation,
            image_url: row.image_url,
            audio_url: row.audio_url,
            source: row.source,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 50))]
    pub subject: String,
    pub difficulty: Difficulty,
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_index: Option<usize>,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub correct_text: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

impl CreateQuestionRequest {
    /// Checks that the answer key is consistent with the question type.
    pub fn validate_answer_key(&self) -> Result<(), validator::ValidationError> {
        match self.question_type {
            QuestionType::FillBlank => {
                if self.correct_text.trim().is_empty() {
                    return Err(validator::ValidationError::new("missing_correct_text"));
                }
            }
            QuestionType::MultipleChoice | QuestionType::TrueFalse => {
                if self.options.len() < 2 {
                    return Err(validator::ValidationError::new("options_cannot_be_empty"));
                }
                match self.correct_index {
                    Some(i) if i < self.options.len() => {}
                    _ => return Err(validator::ValidationError::new("correct_index_out_of_range")),
                }
            }
        }
        Ok(())
    }

    pub fn into_question(self) -> Question {
        let correct_text = match self.correct_index.and_then(|i| self.options.get(i)) {
            Some(option) if self.correct_text.is_empty() => option.clone(),
            _ => self.correct_text,
        };

        Question {
            id: uuid::Uuid::new_v4().to_string(),
            subject: self.subject,
            difficulty: self.difficulty,
            question_type: self.question_type,
            text: self.text,
            options: self.options,
            correct_index: self.correct_index,
            correct_text,
            explanation: self.explanation,
            hints: self.hints,
            tags: self.tags,
            image_url: self.image_url,
            audio_url: self.audio_url,
            source: Some("manual".to_string()),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() > 10 {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_type: QuestionType, options: Vec<&str>, correct_index: Option<usize>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            subject: "Toán học".to_string(),
            difficulty: Difficulty::Easy,
            question_type,
            text: "2 + 3 = ?".to_string(),
            options: options.into_iter().map(String::from).collect(),
            correct_index,
            correct_text: String::new(),
            explanation: String::new(),
            hints: Vec::new(),
            tags: Vec::new(),
            image_url: None,
            audio_url: None,
        }
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("Easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!(" hard ".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_create_request_fills_correct_text_from_option() {
        let req = request(QuestionType::MultipleChoice, vec!["4", "5", "6", "7"], Some(1));
        assert!(req.validate().is_ok());
        assert!(req.validate_answer_key().is_ok());

        let question = req.into_question();
        assert_eq!(question.correct_text, "5");
        assert_eq!(question.correct_answer_label(), "5");
        assert!(question.is_active);
    }

    #[test]
    fn test_create_request_rejects_out_of_range_index() {
        let req = request(QuestionType::MultipleChoice, vec!["4", "5"], Some(3));
        assert!(req.validate_answer_key().is_err());
    }

    #[test]
    fn test_create_request_fill_blank_needs_text() {
        let req = request(QuestionType::FillBlank, vec![], None);
        assert!(req.validate_answer_key().is_err());
    }
}
