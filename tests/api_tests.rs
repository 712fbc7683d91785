// tests/api_tests.rs

use serde_json::{Value, json};
use smart_quiz::{
    config::Config,
    models::question::Difficulty,
    routes,
    state::AppState,
    test_support::{TestHarness, sample_questions},
};

struct TestApp {
    address: String,
    client: reqwest::Client,
    harness: TestHarness,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn start_quiz(&self, subject: &str, count: usize) -> Value {
        let response = self
            .post(
                "/api/quiz/sessions",
                json!({"subject": subject, "difficulty": "easy", "question_count": count}),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

/// Spawns the app on a random port over an in-memory database with stubbed
/// AI collaborators.
async fn spawn_app() -> TestApp {
    let harness = TestHarness::new().await;
    let config = Config {
        rust_log: "error".to_string(),
        ..Config::default()
    };

    let state = AppState::with_deps(harness.pool.clone(), config, harness.deps());
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        harness,
    }
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;
    let response = app.get("/random_path_that_does_not_exist").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn full_quiz_flow_scores_and_persists() {
    let app = spawn_app().await;
    app.harness.seed(sample_questions("Toán học", Difficulty::Easy, 5)).await;

    let started = app.start_quiz("Toán học", 5).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let questions = started["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    // The answer key never leaves the server.
    assert!(questions[0].get("correct_index").is_none());
    assert_eq!(started["snapshot"]["state"], "in_progress");

    let mut last = Value::Null;
    for _ in 0..5 {
        let response = app
            .post(
                &format!("/api/quiz/sessions/{}/answer", session_id),
                json!({"selection": {"index": 1}, "confidence": "high"}),
            )
            .await;
        assert_eq!(response.status().as_u16(), 200);

        let response = app
            .post(&format!("/api/quiz/sessions/{}/advance", session_id), json!({}))
            .await;
        assert_eq!(response.status().as_u16(), 200);
        last = response.json().await.unwrap();
    }

    assert_eq!(last["state"], "completed");
    assert_eq!(last["submission"]["status"], "success");
    let outcome = &last["submission"]["data"];
    assert_eq!(outcome["score"]["correct"], 5);
    assert_eq!(outcome["score"]["percentage"], 100.0);
    assert_eq!(outcome["score"]["grade"], "A+");
    // 5 x 10 plus speed, confidence and no-hint bonuses.
    assert_eq!(outcome["score"]["points"], 95);

    let quiz_id = outcome["quiz_id"].as_i64().unwrap();
    let detail: Value = app
        .get(&format!("/api/quiz/results/{}", quiz_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["answers"].as_array().unwrap().len(), 5);
    assert_eq!(detail["quiz"]["subject"], "Toán học");

    let leaderboard: Value = app.get("/api/quiz/leaderboard?limit=5").await.json().await.unwrap();
    assert_eq!(leaderboard[0]["rank"], 1);
    assert_eq!(leaderboard[0]["quiz_id"], quiz_id);

    let statistics: Value = app.get("/api/quiz/statistics").await.json().await.unwrap();
    assert_eq!(statistics["total_quizzes"], 1);

    let response = app
        .post(&format!("/api/quiz/results/{}/synced", quiz_id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 204);
}

#[tokio::test]
async fn answering_a_completed_quiz_conflicts() {
    let app = spawn_app().await;
    app.harness.seed(sample_questions("Toán học", Difficulty::Easy, 1)).await;

    let started = app.start_quiz("Toán học", 1).await;
    let session_id = started["session_id"].as_str().unwrap();

    app.post(&format!("/api/quiz/sessions/{}/advance", session_id), json!({}))
        .await;
    let response = app
        .post(
            &format!("/api/quiz/sessions/{}/answer", session_id),
            json!({"selection": {"index": 1}}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn failed_save_can_be_retried() {
    let app = spawn_app().await;
    app.harness.seed(sample_questions("Toán học", Difficulty::Easy, 1)).await;
    app.harness.results.fail_next(1);

    let started = app.start_quiz("Toán học", 1).await;
    let session_id = started["session_id"].as_str().unwrap();

    let response = app
        .post(&format!("/api/quiz/sessions/{}/advance", session_id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 503);

    let snapshot: Value = app
        .get(&format!("/api/quiz/sessions/{}", session_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(snapshot["state"], "completed");
    assert_eq!(snapshot["submission"]["status"], "error");
    assert!(snapshot["submission"]["data"]["quiz_id"].is_null());

    let response = app
        .post(&format!("/api/quiz/sessions/{}/retry", session_id), json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let snapshot: Value = response.json().await.unwrap();
    assert_eq!(snapshot["submission"]["status"], "success");
    assert!(snapshot["submission"]["data"]["quiz_id"].is_i64());
}

#[tokio::test]
async fn start_rejects_invalid_requests() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/quiz/sessions",
            json!({"subject": "Toán học", "difficulty": "easy", "question_count": 0}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post(
            "/api/quiz/sessions",
            json!({"subject": "Toán học", "difficulty": "easy", "time_limit_minutes": 61}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    app.harness.generator.fail();
    let response = app
        .post(
            "/api/quiz/sessions",
            json!({"subject": "Thiên văn", "difficulty": "hard"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn hints_and_abandon() {
    let app = spawn_app().await;
    app.harness.seed(sample_questions("Vật lý", Difficulty::Easy, 2)).await;

    let started = app.start_quiz("Vật lý", 2).await;
    let session_id = started["session_id"].as_str().unwrap();

    let hint: Value = app
        .post(&format!("/api/quiz/sessions/{}/hint", session_id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert!(hint["hint"].is_string());
    assert_eq!(hint["hints_used"], 1);

    let hint: Value = app
        .post(&format!("/api/quiz/sessions/{}/hint", session_id), json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert!(hint["hint"].is_null());

    let response = app
        .client
        .delete(app.url(&format!("/api/quiz/sessions/{}", session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = app.get(&format!("/api/quiz/sessions/{}", session_id)).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn question_bank_and_subjects() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/questions",
            json!({
                "subject": "Địa lý",
                "difficulty": "medium",
                "question_type": "multiple_choice",
                "text": "Thủ đô của Việt Nam là gì?",
                "options": ["Huế", "Hà Nội", "Đà Nẵng", "Sài Gòn"],
                "correct_index": 1,
                "explanation": "Hà Nội là thủ đô"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let created: Value = response.json().await.unwrap();
    let question_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["correct_text"], "Hà Nội");

    let response = app
        .post(
            "/api/questions",
            json!({
                "subject": "Địa lý",
                "difficulty": "medium",
                "question_type": "multiple_choice",
                "text": "?",
                "options": ["a", "b"],
                "correct_index": 5
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let subjects: Value = app.get("/api/subjects").await.json().await.unwrap();
    assert_eq!(subjects[0]["subject"], "Địa lý");
    assert_eq!(subjects[0]["question_count"], 1);
    assert!(subjects[0]["average_score"].is_null());

    let response = app
        .client
        .delete(app.url(&format!("/api/questions/{}", question_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .client
        .delete(app.url("/api/questions/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = app.get("/api/subjects/Địa lý").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn completed_quiz_credits_the_owner() {
    let app = spawn_app().await;
    app.harness.seed(sample_questions("Toán học", Difficulty::Easy, 2)).await;

    let response = app
        .post(
            "/api/quiz/sessions",
            json!({"subject": "Toán học", "difficulty": "easy", "question_count": 2, "user_id": "lan"}),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let started: Value = response.json().await.unwrap();
    let session_id = started["session_id"].as_str().unwrap();

    let mut last = Value::Null;
    for _ in 0..2 {
        app.post(
            &format!("/api/quiz/sessions/{}/answer", session_id),
            json!({"selection": {"index": 1}}),
        )
        .await;
        last = app
            .post(&format!("/api/quiz/sessions/{}/advance", session_id), json!({}))
            .await
            .json()
            .await
            .unwrap();
    }
    assert_eq!(last["submission"]["data"]["xp_gained"], 24);

    let progress: Value = app.get("/api/users/lan/progress").await.json().await.unwrap();
    assert_eq!(progress["total_quizzes"], 1);
    assert_eq!(progress["total_correct"], 2);
    assert_eq!(progress["total_xp"], 24);
    assert_eq!(progress["average_accuracy"], 100.0);

    let statistics: Value = app.get("/api/users/lan/statistics").await.json().await.unwrap();
    assert_eq!(statistics["recent"]["total_quizzes"], 1);
    assert_eq!(statistics["progress"]["user_id"], "lan");

    let response = app.get("/api/users/nobody/progress").await;
    assert_eq!(response.status().as_u16(), 404);
}
