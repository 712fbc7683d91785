// tests/store_tests.rs

use chrono::{Duration, Utc};
use smart_quiz::{
    models::{
        answer::{Answer, Confidence, Selection},
        question::{Difficulty, Question, QuestionType},
        quiz::{Quiz, Score},
    },
    repositories::{QuestionStore, ResultStore, SqliteQuestionStore, SqliteResultStore},
    test_support::{memory_pool, sample_questions},
};

fn quiz(subject: &str, correct: u32, total: u32) -> Quiz {
    let started_at = Utc::now() - Duration::minutes(10);
    Quiz {
        id: None,
        user_id: Some("u1".to_string()),
        subject: subject.to_string(),
        difficulty: Difficulty::Easy,
        question_ids: (0..total).map(|i| format!("q{}", i)).collect(),
        time_limit_secs: 900,
        started_at,
        completed_at: Some(started_at + Duration::minutes(5)),
        score: Score {
            correct,
            total,
            points: correct * 10,
            ..Score::default()
        },
        time_spent_ms: 300_000,
        feedback: Some("Tốt".to_string()),
        suggestions: vec!["Ôn tập".to_string()],
        is_synced: false,
    }
}

fn answer(question_id: &str, selection: Option<Selection>, is_correct: bool) -> Answer {
    Answer {
        quiz_id: None,
        question_id: question_id.to_string(),
        selection,
        is_correct,
        time_spent_ms: 1_500,
        hints_used: 1,
        confidence: Some(Confidence::Medium),
        answered_at: Utc::now(),
    }
}

#[tokio::test]
async fn random_questions_respect_filters_and_limit() {
    let store = SqliteQuestionStore::new(memory_pool().await);
    store.insert(&sample_questions("Toán học", Difficulty::Easy, 6)).await.unwrap();
    store.insert(&sample_questions("Toán học", Difficulty::Hard, 2)).await.unwrap();
    store.insert(&sample_questions("Vật lý", Difficulty::Easy, 1)).await.unwrap();

    let picked = store.random_questions("Toán học", Difficulty::Easy, 4).await.unwrap();
    assert_eq!(picked.len(), 4);
    assert!(picked.iter().all(|q| q.subject == "Toán học" && q.difficulty == Difficulty::Easy));

    let hard = store.random_questions("Toán học", Difficulty::Hard, 10).await.unwrap();
    assert_eq!(hard.len(), 2);

    assert_eq!(store.all_subjects().await.unwrap(), vec!["Toán học", "Vật lý"]);
    assert_eq!(store.question_count("Toán học").await.unwrap(), 8);
}

#[tokio::test]
async fn questions_round_trip_and_deactivate() {
    let store = SqliteQuestionStore::new(memory_pool().await);

    let mut fill = sample_questions("Địa lý", Difficulty::Medium, 1).remove(0);
    fill.question_type = QuestionType::FillBlank;
    fill.options.clear();
    fill.correct_index = None;
    fill.correct_text = "Hà Nội".to_string();
    fill.tags = vec!["thủ đô".to_string()];
    store.insert(std::slice::from_ref(&fill)).await.unwrap();

    let loaded = store.question_by_id(&fill.id).await.unwrap().unwrap();
    assert_eq!(loaded.question_type, QuestionType::FillBlank);
    assert_eq!(loaded.correct_text, "Hà Nội");
    assert!(loaded.options.is_empty());
    assert_eq!(loaded.tags, fill.tags);
    assert_eq!(loaded.hints, fill.hints);

    assert!(store.deactivate(&fill.id).await.unwrap());
    assert!(!store.deactivate("missing").await.unwrap());
    assert!(store.random_questions("Địa lý", Difficulty::Medium, 5).await.unwrap().is_empty());
    // Deactivated questions stay readable for stored quizzes.
    assert!(store.question_by_id(&fill.id).await.unwrap().is_some());
}

#[tokio::test]
async fn completed_quiz_is_saved_with_answers() {
    let store = SqliteResultStore::new(memory_pool().await);
    let answers = vec![
        answer("q0", Some(Selection::Index(2)), true),
        answer("q1", Some(Selection::Text("Huế".to_string())), false),
        answer("q2", None, false),
    ];

    let id = store.save_completed(&quiz("Toán học", 1, 3), &answers).await.unwrap();

    let stored = store.quiz_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.score.correct, 1);
    assert_eq!(stored.suggestions, vec!["Ôn tập"]);
    assert!(stored.is_completed());

    let loaded = store.answers_by_quiz(id).await.unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(loaded.iter().all(|a| a.quiz_id == Some(id)));
    assert_eq!(loaded[0].selection, Some(Selection::Index(2)));
    assert_eq!(loaded[1].selection, Some(Selection::Text("Huế".to_string())));
    assert_eq!(loaded[2].selection, None);
    assert_eq!(loaded[0].confidence, Some(Confidence::Medium));
}

#[tokio::test]
async fn failed_save_leaves_nothing_behind() {
    let store = SqliteResultStore::new(memory_pool().await);
    // Duplicate question ids violate the per-quiz uniqueness constraint.
    let answers = vec![answer("q0", None, false), answer("q0", None, false)];

    assert!(store.save_completed(&quiz("Toán học", 0, 2), &answers).await.is_err());
    assert!(store.recent_quizzes(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn separate_inserts_need_a_quiz_id() {
    let store = SqliteResultStore::new(memory_pool().await);
    let id = store.insert_quiz(&quiz("Toán học", 1, 1)).await.unwrap();

    assert!(store.insert_answers(&[answer("q0", None, false)]).await.is_err());

    let linked = Answer {
        quiz_id: Some(id),
        ..answer("q0", Some(Selection::Index(0)), true)
    };
    store.insert_answers(&[linked]).await.unwrap();
    assert_eq!(store.answers_by_quiz(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn leaderboard_average_and_sync() {
    let store = SqliteResultStore::new(memory_pool().await);
    let low = store.save_completed(&quiz("Toán học", 2, 4), &[]).await.unwrap();
    let high = store.save_completed(&quiz("Toán học", 4, 4), &[]).await.unwrap();
    let mid = store.save_completed(&quiz("Vật lý", 3, 4), &[]).await.unwrap();

    let top: Vec<Option<i64>> = store.top_scores(2).await.unwrap().iter().map(|q| q.id).collect();
    assert_eq!(top, vec![Some(high), Some(mid)]);

    assert_eq!(store.average_score("Toán học").await.unwrap(), Some(75.0));
    assert_eq!(store.average_score("Hóa học").await.unwrap(), None);

    assert!(store.mark_synced(low).await.unwrap());
    assert!(store.quiz_by_id(low).await.unwrap().unwrap().is_synced);
    assert!(!store.mark_synced(9999).await.unwrap());
}

#[tokio::test]
async fn reinserting_a_question_never_rewrites_it() {
    let store = SqliteQuestionStore::new(memory_pool().await);
    let original = sample_questions("Toán học", Difficulty::Easy, 1).remove(0);
    assert_eq!(store.insert(std::slice::from_ref(&original)).await.unwrap(), 1);
    assert!(store.deactivate(&original.id).await.unwrap());

    let mut changed = original.clone();
    changed.text = "MUTATED".to_string();
    changed.correct_index = Some(3);
    let fresh = sample_questions("Toán học", Difficulty::Easy, 1).remove(0);
    assert_eq!(store.insert(&[changed, fresh]).await.unwrap(), 1);

    let stored = store.question_by_id(&original.id).await.unwrap().unwrap();
    assert_eq!(stored.text, original.text);
    assert_eq!(stored.correct_index, original.correct_index);
    assert!(!stored.is_active);
    assert_eq!(store.question_count("Toán học").await.unwrap(), 1);
}

#[tokio::test]
async fn saved_quizzes_accumulate_user_progress() {
    let store = SqliteResultStore::new(memory_pool().await);
    assert!(store.user_progress("u1").await.unwrap().is_none());

    store.save_completed(&quiz("Toán học", 3, 4), &[]).await.unwrap();
    let hard = Quiz {
        difficulty: Difficulty::Hard,
        ..quiz("Vật lý", 2, 4)
    };
    store.save_completed(&hard, &[]).await.unwrap();
    let anonymous = Quiz {
        user_id: None,
        ..quiz("Toán học", 4, 4)
    };
    store.save_completed(&anonymous, &[]).await.unwrap();

    let progress = store.user_progress("u1").await.unwrap().unwrap();
    assert_eq!(progress.total_quizzes, 2);
    assert_eq!(progress.total_questions, 8);
    assert_eq!(progress.total_correct, 5);
    assert_eq!(progress.total_time_spent_ms, 600_000);
    // 3 easy (x1.2) and 2 hard (x2.0) correct answers.
    assert_eq!(progress.total_xp, 36 + 40);
    assert_eq!(progress.average_accuracy(), 62.5);

    let mine = store.recent_quizzes_for_user("u1", 10).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|q| q.user_id.as_deref() == Some("u1")));
}

#[tokio::test]
async fn failed_save_does_not_touch_progress() {
    let store = SqliteResultStore::new(memory_pool().await);
    store.save_completed(&quiz("Toán học", 1, 2), &[]).await.unwrap();

    let answers = vec![answer("q0", None, false), answer("q0", None, false)];
    assert!(store.save_completed(&quiz("Toán học", 2, 2), &answers).await.is_err());

    let progress = store.user_progress("u1").await.unwrap().unwrap();
    assert_eq!(progress.total_quizzes, 1);
    assert_eq!(progress.total_correct, 1);
}
