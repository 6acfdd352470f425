// tests/quiz_flow_tests.rs
//
// End-to-end flow against a real Postgres instance. The whole module
// skips itself when DATABASE_URL is unset so the rest of the suite can
// run without a database.

use std::net::SocketAddr;

use edusync_backend::{config::Config, routes, state::AppState, utils::hash::legacy_digest};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn spawn_app(database_url: &str) -> (String, PgPool) {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.to_string(),
        jwt_secret: "quiz_flow_test_secret".to_string(),
        jwt_issuer: "edusync-backend".to_string(),
        jwt_audience: "edusync-clients".to_string(),
        jwt_expiration_secs: 600,
        port: 0,
        frontend_url: "http://localhost:3000".to_string(),
        rust_log: "error".to_string(),
        admin_name: None,
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (address, pool)
}

async fn register_and_login(
    client: &reqwest::Client,
    address: &str,
    name: &str,
    email: &str,
    role: &str,
) -> (Uuid, String) {
    let response = client
        .post(&format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "name": name,
            "email": email,
            "password": "password123",
            "role": role
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "password123"}))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    let user_id = login["user"]["user_id"].as_str().unwrap().parse().unwrap();
    let token = login["token"].as_str().unwrap().to_string();
    (user_id, token)
}

#[tokio::test]
async fn test_quiz_submission_flow() {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping quiz flow test");
        return;
    };

    // Arrange
    let (address, _pool) = spawn_app(&database_url).await;
    let client = reqwest::Client::new();
    let tag = &Uuid::new_v4().to_string()[..8];

    // 1. Setup an instructor and a student
    let (instructor_id, instructor_token) = register_and_login(
        &client,
        &address,
        "Prof. Okafor",
        &format!("instructor_{}@example.com", tag),
        "Instructor",
    )
    .await;
    let (student_id, student_token) = register_and_login(
        &client,
        &address,
        "Maya",
        &format!("student_{}@example.com", tag),
        "Student",
    )
    .await;

    // 2. Instructor creates a course; the watch link must come back in
    // embed form
    let course = client
        .post(&format!("{}/api/courses", address))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({
            "title": format!("Rust Basics {}", tag),
            "description": "<p>Ownership and <b>borrowing</b></p><script>alert(1)</script>",
            "instructor_id": instructor_id,
            "course_url": "https://www.youtube.com/watch?v=abc123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(course.status().as_u16(), 201);
    let course = course.json::<serde_json::Value>().await.unwrap();
    let course_id = course["course_id"].as_str().unwrap();
    assert_eq!(course["course_url"], "https://www.youtube.com/embed/abc123");
    assert!(!course["description"].as_str().unwrap().contains("script"));

    // 3. Instructor creates an assessment with two questions
    let q1 = Uuid::new_v4();
    let q1_right = Uuid::new_v4();
    let q1_wrong = Uuid::new_v4();
    let q2 = Uuid::new_v4();
    let q2_right = Uuid::new_v4();
    let q2_wrong = Uuid::new_v4();

    let assessment = client
        .post(&format!("{}/api/assessments", address))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({
            "course_id": course_id,
            "title": "Week 1 quiz",
            "max_score": 2,
            "questions": [
                {
                    "question_id": q1,
                    "question_text": "What does `let` do?",
                    "options": [
                        {"option_id": q1_right, "text": "Binds a value", "is_correct": true},
                        {"option_id": q1_wrong, "text": "Frees a value"}
                    ]
                },
                {
                    "question_id": q2,
                    "question_text": "Which keyword borrows?",
                    "options": [
                        {"option_id": q2_wrong, "text": "move"},
                        {"option_id": q2_right, "text": "&", "is_correct": true}
                    ]
                }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(assessment.status().as_u16(), 201);
    let assessment = assessment.json::<serde_json::Value>().await.unwrap();
    let assessment_id = assessment["assessment_id"].as_str().unwrap();
    assert_eq!(assessment["questions"].as_array().unwrap().len(), 2);

    // 4. The per-course listing counts the questions
    let summaries = client
        .get(&format!("{}/api/assessments/course/{}", address, course_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json::<Vec<serde_json::Value>>()
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["question_count"], 2);

    // 5. Student submits one right and one wrong answer; the server
    // derives the score
    let submit = client
        .post(&format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "assessment_id": assessment_id,
            "answers": [
                {"question_id": q1, "selected_option_id": q1_right},
                {"question_id": q2, "selected_option_id": q2_wrong}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 201);
    let result = submit.json::<serde_json::Value>().await.unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["user_id"].as_str().unwrap(), student_id.to_string());

    // 6. A second attempt replaces the first instead of adding a row
    let resubmit = client
        .post(&format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "assessment_id": assessment_id,
            "answers": [
                {"question_id": q1, "selected_option_id": q1_right},
                {"question_id": q2, "selected_option_id": q2_right}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(resubmit["score"], 2);
    assert_eq!(resubmit["result_id"], result["result_id"]);

    let my_results = client
        .get(&format!("{}/api/results", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json::<Vec<serde_json::Value>>()
        .await
        .unwrap();
    let mine: Vec<_> = my_results
        .iter()
        .filter(|r| r["assessment_id"].as_str() == Some(assessment_id))
        .collect();
    assert_eq!(mine.len(), 1);

    // 7. The graded report reviews every question
    let report = client
        .get(&format!(
            "{}/api/assessments/{}/result/{}",
            address, assessment_id, student_id
        ))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(report["total_questions"], 2);
    assert_eq!(report["correct_answers"], 2);
    assert_eq!(report["score"], "2/2");
    assert_eq!(report["answers"].as_array().unwrap().len(), 2);

    // 8. The instructor can read the student's report too
    let report = client
        .get(&format!(
            "{}/api/assessments/{}/result/{}",
            address, assessment_id, student_id
        ))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .send()
        .await
        .unwrap();
    assert_eq!(report.status().as_u16(), 200);

    // 9. Deleting the course cascades down to the result
    let delete = client
        .delete(&format!("{}/api/courses/{}", address, course_id))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status().as_u16(), 204);

    let result_id = result["result_id"].as_str().unwrap();
    let gone = client
        .get(&format!("{}/api/results/{}", address, result_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn test_legacy_credential_migrates_on_login() {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping legacy credential test");
        return;
    };

    // Arrange: a row written before salting shipped, NULL salt and an
    // unsalted digest
    let (address, pool) = spawn_app(&database_url).await;
    let client = reqwest::Client::new();
    let email = format!("legacy_{}@example.com", &Uuid::new_v4().to_string()[..8]);
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (user_id, name, email, role, password_hash, password_salt) \
         VALUES ($1, 'Old Timer', $2, 'Student', $3, NULL)",
    )
    .bind(user_id)
    .bind(&email)
    .bind(legacy_digest("old password 9"))
    .execute(&pool)
    .await
    .unwrap();

    // Act: wrong password still fails, right password logs in
    let wrong = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "guess"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 400);

    let login = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "old password 9"}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);

    // Assert: the row now carries a salted credential
    let (hash, salt): (String, Option<String>) =
        sqlx::query_as("SELECT password_hash, password_salt FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(salt.is_some_and(|s| !s.is_empty()));
    assert_ne!(hash, legacy_digest("old password 9"));

    // And the new credential keeps working
    let again = client
        .post(&format!("{}/api/auth/login", address))
        .json(&serde_json::json!({"email": email, "password": "old password 9"}))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 200);
}
