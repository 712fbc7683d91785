// src/quiz/stats.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::quiz::Quiz;

/// Number of latest quizzes shown as recent performance.
const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
    pub subject: String,
    pub average_percentage: f64,
    pub quizzes: usize,
}

/// Aggregate view over a user's completed quizzes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuizStatistics {
    pub total_quizzes: usize,
    pub average_percentage: f64,
    pub total_time_spent_ms: u64,
    /// Percentages of the latest quizzes, newest first.
    pub recent_performance: Vec<f64>,
    /// Average of the newer half minus average of the older half.
    pub improvement_trend: f64,
    pub strongest_subject: Option<SubjectAverage>,
    pub weakest_subject: Option<SubjectAverage>,
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

pub fn summarize(quizzes: &[Quiz]) -> QuizStatistics {
    let mut completed: Vec<&Quiz> = quizzes.iter().filter(|q| q.is_completed()).collect();
    if completed.is_empty() {
        return QuizStatistics::default();
    }
    // Oldest first.
    completed.sort_by_key(|q| q.started_at);

    let percentages: Vec<f64> = completed.iter().map(|q| q.score.percentage()).collect();

    let improvement_trend = if percentages.len() < 2 {
        0.0
    } else {
        let (older, newer) = percentages.split_at(percentages.len() / 2);
        average(newer.iter().copied()) - average(older.iter().copied())
    };

    let mut by_subject: HashMap<&str, Vec<f64>> = HashMap::new();
    for quiz in &completed {
        by_subject
            .entry(quiz.subject.as_str())
            .or_default()
            .push(quiz.score.percentage());
    }
    let mut subjects: Vec<SubjectAverage> = by_subject
        .into_iter()
        .map(|(subject, values)| SubjectAverage {
            subject: subject.to_string(),
            average_percentage: average(values.iter().copied()),
            quizzes: values.len(),
        })
        .collect();
    subjects.sort_by(|a, b| {
        b.average_percentage
            .total_cmp(&a.average_percentage)
            .then_with(|| a.subject.cmp(&b.subject))
    });

    QuizStatistics {
        total_quizzes: completed.len(),
        average_percentage: average(percentages.iter().copied()),
        total_time_spent_ms: completed.iter().map(|q| q.time_spent_ms).sum(),
        recent_performance: percentages.iter().rev().take(RECENT_WINDOW).copied().collect(),
        improvement_trend,
        strongest_subject: subjects.first().cloned(),
        weakest_subject: if subjects.len() > 1 { subjects.last().cloned() } else { None },
    }
}
