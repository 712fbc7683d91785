// src/quiz/feedback.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::FeedbackBands,
    error::{AiError, QuizError},
    models::question::{Difficulty, Question},
};

/// An answer the user got wrong, as described to the feedback generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrongAnswer {
    pub question: String,
    pub correct_answer: String,
    pub user_answer: String,
}

/// Everything the feedback generator is told about a finished quiz.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackContext {
    pub subject: String,
    pub difficulty: Difficulty,
    pub total: u32,
    pub correct: u32,
    pub time_spent_ms: u64,
    pub wrong_answers: Vec<WrongAnswer>,
}

impl FeedbackContext {
    /// Whole-number percentage, truncated.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            self.correct * 100 / self.total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub text: String,
    pub suggestions: Vec<String>,
}

/// Writes commentary on a finished quiz.
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate_feedback(&self, context: &FeedbackContext) -> Result<Feedback, AiError>;
}

/// Produces new questions when the store runs short.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>, AiError>;
}

const FALLBACK_SUGGESTIONS: [&str; 4] = [
    "Ôn tập lại các khái niệm cơ bản",
    "Làm thêm bài tập thực hành",
    "Tìm hiểu sâu hơn về các chủ đề còn yếu",
    "Luyện tập thường xuyên để ghi nhớ lâu hơn",
];

/// Rule-based feedback derived only from the percentage band.
pub fn fallback_feedback(percentage: u32, subject: &str, bands: &FeedbackBands) -> Feedback {
    let text = match percentage {
        p if p >= bands.excellent => {
            format!("Xuất sắc! Bạn đã thể hiện sự hiểu biết vững vàng về {}.", subject)
        }
        p if p >= bands.very_good => {
            format!("Rất tốt! Bạn đã nắm được phần lớn kiến thức về {}.", subject)
        }
        p if p >= bands.good => format!("Khá tốt! Bạn đã có nền tảng tốt về {}.", subject),
        p if p >= bands.fair => format!("Ổn! Bạn cần ôn tập thêm một số phần trong {}.", subject),
        _ => format!("Cần cố gắng hơn! Hãy dành thời gian ôn tập kỹ lưỡng {}.", subject),
    };

    Feedback {
        text,
        suggestions: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Asks the generator for feedback and substitutes the rule-based text on
/// any failure. Never fails.
pub async fn feedback_or_fallback(
    generator: &dyn FeedbackGenerator,
    context: &FeedbackContext,
    bands: &FeedbackBands,
) -> Feedback {
    match generator.generate_feedback(context).await {
        Ok(feedback) if !feedback.text.trim().is_empty() => feedback,
        Ok(_) => {
            tracing::warn!(subject = %context.subject, "Empty AI feedback, using fallback");
            fallback_feedback(context.percentage(), &context.subject, bands)
        }
        Err(e) => {
            let err = QuizError::FeedbackUnavailable(e.to_string());
            tracing::warn!(subject = %context.subject, "{}; using fallback", err);
            fallback_feedback(context.percentage(), &context.subject, bands)
        }
    }
}

/// Splits a bullet list such as "• a\n• b" into items.
pub fn split_suggestions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim().trim_start_matches(['•', '-', '*']).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
