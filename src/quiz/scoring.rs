// src/quiz/scoring.rs

use std::collections::HashMap;
use std::time::Duration;

use crate::{
    config::ScoringRules,
    models::{
        answer::{Answer, Selection},
        question::{Question, QuestionType},
        quiz::{Bonuses, Score},
    },
};

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether `selection` answers `question` correctly. An empty selection is
/// always wrong.
pub fn is_correct(question: &Question, selection: Option<&Selection>) -> bool {
    let Some(selection) = selection else {
        return false;
    };

    match (question.question_type, selection) {
        (QuestionType::MultipleChoice | QuestionType::TrueFalse, Selection::Index(i)) => {
            question.correct_index == Some(*i)
        }
        (QuestionType::MultipleChoice | QuestionType::TrueFalse, Selection::Text(text)) => {
            !question.correct_answer_label().trim().is_empty()
                && normalize(text) == normalize(&question.correct_answer_label())
        }
        (QuestionType::FillBlank, Selection::Text(text)) => {
            normalize(text) == normalize(&question.correct_text)
        }
        (QuestionType::FillBlank, Selection::Index(i)) => question
            .options
            .get(*i)
            .is_some_and(|option| normalize(option) == normalize(&question.correct_text)),
    }
}

/// Scores a quiz from its questions and recorded answers.
///
/// Answers for questions outside `questions` are ignored. `time_limit` is the
/// whole quiz's limit; the speed bonus compares against its per-question share.
pub fn score(
    questions: &[Question],
    answers: &[Answer],
    time_limit: Duration,
    rules: &ScoringRules,
) -> Score {
    let total = questions.len();
    if total == 0 {
        return Score::default();
    }

    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();
    let relevant: Vec<&Answer> = answers
        .iter()
        .filter(|a| by_id.contains_key(a.question_id.as_str()))
        .collect();

    let correct = relevant
        .iter()
        .filter(|a| is_correct(by_id[a.question_id.as_str()], a.selection.as_ref()))
        .count();

    let bonuses = Bonuses {
        speed: speed_bonus(&relevant, total, time_limit, rules),
        confidence: {
            let high = relevant
                .iter()
                .filter(|a| a.confidence.is_some_and(|c| c.is_high()))
                .count();
            high as f64 > total as f64 * rules.confidence_ratio
        },
        no_hint: relevant.len() == total && relevant.iter().all(|a| a.hints_used == 0),
    };

    let mut points = correct as u32 * rules.points_per_correct;
    if bonuses.speed {
        points += rules.speed_bonus;
    }
    if bonuses.confidence {
        points += rules.confidence_bonus;
    }
    if bonuses.no_hint {
        points += rules.no_hint_bonus;
    }

    Score {
        correct: correct as u32,
        total: total as u32,
        points,
        bonuses,
    }
}

fn speed_bonus(answers: &[&Answer], total: usize, time_limit: Duration, rules: &ScoringRules) -> bool {
    if answers.is_empty() {
        return false;
    }

    let average_ms =
        answers.iter().map(|a| a.time_spent_ms as f64).sum::<f64>() / answers.len() as f64;
    let expected_ms = time_limit.as_millis() as f64 / total as f64;

    average_ms < expected_ms * rules.speed_ratio
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{answer::Confidence, question::Difficulty};

    fn question(id: &str, correct_index: usize) -> Question {
        let mut q = Question::multiple_choice(
            "Toán học",
            Difficulty::Easy,
            "?",
            vec!["4".into(), "5".into(), "6".into(), "7".into()],
            correct_index,
            "",
        );
        q.id = id.to_string();
        q
    }

    fn answer(question_id: &str, selection: Option<Selection>, time_spent_ms: u64) -> Answer {
        Answer {
            quiz_id: None,
            question_id: question_id.to_string(),
            selection,
            is_correct: false,
            time_spent_ms,
            hints_used: 0,
            confidence: None,
            answered_at: Utc::now(),
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n).map(|i| question(&format!("q{}", i), 1)).collect()
    }

    #[test]
    fn test_index_selection() {
        let q = question("q", 1);
        assert!(is_correct(&q, Some(&Selection::Index(1))));
        assert!(!is_correct(&q, Some(&Selection::Index(0))));
        assert!(!is_correct(&q, None));
    }

    #[test]
    fn test_text_selection_is_trimmed_and_case_insensitive() {
        let mut q = question("q", 0);
        q.question_type = QuestionType::FillBlank;
        q.options.clear();
        q.correct_index = None;
        q.correct_text = "Hà Nội".to_string();

        assert!(is_correct(&q, Some(&Selection::Text("  hà nội ".to_string()))));
        assert!(!is_correct(&q, Some(&Selection::Text("Huế".to_string()))));
    }

    #[test]
    fn test_text_selection_on_choice_question_matches_option_text() {
        let q = question("q", 1);
        assert!(is_correct(&q, Some(&Selection::Text(" 5 ".to_string()))));
        assert!(!is_correct(&q, Some(&Selection::Text("4".to_string()))));
    }

    #[test]
    fn test_percentage_and_base_points() {
        let qs = questions(4);
        let answers = vec![
            answer("q0", Some(Selection::Index(1)), 60_000),
            answer("q1", Some(Selection::Index(1)), 60_000),
            answer("q2", Some(Selection::Index(0)), 60_000),
            answer("q3", None, 60_000),
        ];
        let rules = ScoringRules::default();

        let score = score(&qs, &answers, Duration::from_secs(240), &rules);
        assert_eq!(score.correct, 2);
        assert_eq!(score.total, 4);
        assert_eq!(score.percentage(), 50.0);
        assert!(!score.bonuses.speed);
        assert!(score.bonuses.no_hint);
        assert_eq!(score.points, 2 * 10 + rules.no_hint_bonus);
    }

    #[test]
    fn test_empty_quiz_scores_zero() {
        let score = score(&[], &[], Duration::from_secs(60), &ScoringRules::default());
        assert_eq!(score, Score::default());
        assert_eq!(score.percentage(), 0.0);
    }

    #[test]
    fn test_confident_but_slow_gets_confidence_bonus_only() {
        let qs = questions(5);
        let answers: Vec<Answer> = qs
            .iter()
            .map(|q| Answer {
                confidence: Some(Confidence::VeryHigh),
                hints_used: 1,
                ..answer(&q.id, Some(Selection::Index(1)), 170_000)
            })
            .collect();

        // 15 minutes over 5 questions is 180s each; 170s is above the 70% cut.
        let score = score(&qs, &answers, Duration::from_secs(15 * 60), &ScoringRules::default());
        assert!(score.bonuses.confidence);
        assert!(!score.bonuses.speed);
        assert!(!score.bonuses.no_hint);
        assert_eq!(score.points, 5 * 10 + 15);
    }

    #[test]
    fn test_fast_answers_get_speed_bonus() {
        let qs = questions(5);
        let answers: Vec<Answer> = qs
            .iter()
            .map(|q| answer(&q.id, Some(Selection::Index(0)), 10_000))
            .collect();

        let score = score(&qs, &answers, Duration::from_secs(15 * 60), &ScoringRules::default());
        assert_eq!(score.correct, 0);
        assert!(score.bonuses.speed);
        assert!(!score.bonuses.confidence);
    }

    #[test]
    fn test_confidence_needs_more_than_threshold() {
        // 4 of 5 is exactly 80%, which is not more than 80%.
        let qs = questions(5);
        let answers: Vec<Answer> = qs
            .iter()
            .enumerate()
            .map(|(i, q)| Answer {
                confidence: if i < 4 { Some(Confidence::High) } else { Some(Confidence::Low) },
                ..answer(&q.id, Some(Selection::Index(1)), 1_000)
            })
            .collect();

        let score = score(&qs, &answers, Duration::from_secs(600), &ScoringRules::default());
        assert!(!score.bonuses.confidence);
    }

    #[test]
    fn test_missing_answer_blocks_no_hint_bonus() {
        let qs = questions(3);
        let answers = vec![
            answer("q0", Some(Selection::Index(1)), 1_000),
            answer("q1", Some(Selection::Index(1)), 1_000),
        ];

        let score = score(&qs, &answers, Duration::from_secs(600), &ScoringRules::default());
        assert!(!score.bonuses.no_hint);
        assert_eq!(score.total, 3);
    }

    #[test]
    fn test_custom_thresholds() {
        let qs = questions(2);
        let answers: Vec<Answer> = qs
            .iter()
            .map(|q| answer(&q.id, Some(Selection::Index(1)), 50_000))
            .collect();
        let rules = ScoringRules {
            speed_ratio: 0.9,
            ..ScoringRules::default()
        };

        // 120s over 2 questions is 60s each; 50s passes at 90% but not at 70%.
        let limit = Duration::from_secs(120);
        assert!(score(&qs, &answers, limit, &rules).bonuses.speed);
        assert!(!score(&qs, &answers, limit, &ScoringRules::default()).bonuses.speed);
    }
}
