// src/services/gemini.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    config::GeminiConfig,
    error::AiError,
    models::question::{Difficulty, Question},
    quiz::feedback::{Feedback, FeedbackContext, FeedbackGenerator, QuestionGenerator, split_suggestions},
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const TOP_K: u32 = 40;
const TOP_P: f32 = 0.95;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Suggestions {
    Bullets(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct GeneratedFeedback {
    feedback: String,
    suggestions: Option<Suggestions>,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            config: GeminiConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Sends a single-turn prompt and returns the text of the first candidate.
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = match &self.config.api_key {
            Some(key) if self.config.is_configured() => key,
            _ => return Err(AiError::NotConfigured),
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_k: TOP_K,
                top_p: TOP_P,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.config.model, "Sending Gemini request");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AiError::MalformedResponse("empty response".to_string()))
    }
}

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn question_prompt(subject: &str, difficulty: Difficulty, count: usize) -> String {
    format!(
        r#"Tạo {count} câu hỏi trắc nghiệm cho môn {subject} với độ khó {difficulty}.

Yêu cầu:
- Câu hỏi phải chính xác và phù hợp với chương trình học phổ thông Việt Nam
- Mỗi câu có 4 đáp án A, B, C, D
- Chỉ có 1 đáp án đúng
- Có giải thích chi tiết cho đáp án đúng
- Trả về định dạng JSON array với cấu trúc:

[
  {{
    "questionText": "Nội dung câu hỏi",
    "optionA": "Đáp án A",
    "optionB": "Đáp án B",
    "optionC": "Đáp án C",
    "optionD": "Đáp án D",
    "correctAnswer": "A",
    "explanation": "Giải thích chi tiết"
  }}
]

Chỉ trả về JSON, không có text khác."#,
        difficulty = difficulty.display_name(),
    )
}

fn feedback_prompt(context: &FeedbackContext) -> String {
    let minutes = context.time_spent_ms / 60_000;
    let seconds = (context.time_spent_ms % 60_000) / 1_000;

    let wrong_answers = if context.wrong_answers.is_empty() {
        "Bạn đã trả lời đúng tất cả câu hỏi!".to_string()
    } else {
        context
            .wrong_answers
            .iter()
            .map(|w| {
                format!(
                    "- Câu: {}\n  Đáp án đúng: {}, Bạn chọn: {}",
                    w.question, w.correct_answer, w.user_answer
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Phân tích kết quả quiz và đưa ra feedback chi tiết:

Thông tin:
- Môn học: {subject}
- Độ khó: {difficulty}
- Điểm số: {percentage}% ({correct}/{total} câu đúng)
- Thời gian: {minutes}m{seconds}s

Câu trả lời sai:
{wrong_answers}

Hãy tạo 2 phần:
1. FEEDBACK: Nhận xét tích cực, động viên và đánh giá kết quả (2-3 câu)
2. SUGGESTIONS: Gợi ý cụ thể để cải thiện (3-4 gợi ý ngắn gọn)

Trả về định dạng JSON:
{{
  "feedback": "Nhận xét tích cực...",
  "suggestions": "• Gợi ý 1\n• Gợi ý 2\n• Gợi ý 3"
}}

Chỉ trả về JSON, không có text khác."#,
        subject = context.subject,
        difficulty = context.difficulty.display_name(),
        percentage = context.percentage(),
        correct = context.correct,
        total = context.total,
    )
}

fn answer_letter_index(letter: &str) -> Option<usize> {
    match letter.trim().to_ascii_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        _ => None,
    }
}

fn parse_questions(text: &str, subject: &str, difficulty: Difficulty) -> Result<Vec<Question>, AiError> {
    let generated: Vec<GeneratedQuestion> = serde_json::from_str(strip_code_fence(text))?;

    let questions: Vec<Question> = generated
        .into_iter()
        .filter_map(|g| {
            let Some(correct_index) = answer_letter_index(&g.correct_answer) else {
                tracing::warn!(answer = %g.correct_answer, "Skipping generated question with invalid answer key");
                return None;
            };
            Some(
                Question::multiple_choice(
                    subject,
                    difficulty,
                    g.question_text.trim(),
                    vec![g.option_a, g.option_b, g.option_c, g.option_d],
                    correct_index,
                    &g.explanation,
                )
                .with_source("ai"),
            )
        })
        .collect();

    if questions.is_empty() {
        return Err(AiError::MalformedResponse("no usable questions".to_string()));
    }
    Ok(questions)
}

fn parse_feedback(text: &str) -> Result<Feedback, AiError> {
    let generated: GeneratedFeedback = serde_json::from_str(strip_code_fence(text))?;
    let suggestions = match generated.suggestions {
        Some(Suggestions::Bullets(raw)) => split_suggestions(&raw),
        Some(Suggestions::List(items)) => items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };

    Ok(Feedback {
        text: generated.feedback.trim().to_string(),
        suggestions,
    })
}

#[async_trait]
impl QuestionGenerator for GeminiClient {
    async fn generate_questions(
        &self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>, AiError> {
        let text = self.generate(&question_prompt(subject, difficulty, count)).await?;
        let questions = parse_questions(&text, subject, difficulty)?;
        tracing::info!(subject, %difficulty, requested = count, generated = questions.len(), "Generated questions");
        Ok(questions)
    }
}

#[async_trait]
impl FeedbackGenerator for GeminiClient {
    async fn generate_feedback(&self, context: &FeedbackContext) -> Result<Feedback, AiError> {
        let text = self.generate(&feedback_prompt(context)).await?;
        parse_feedback(&text)
    }
}
