// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::question::AnswerOption;

/// Represents the 'results' table in the database.
/// One row per (user, assessment); a resubmission overwrites the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizResult {
    pub result_id: Uuid,

    pub user_id: Uuid,

    pub assessment_id: Uuid,

    /// Count of correctly answered questions. Always recomputed from
    /// the stored answers, never taken from the client.
    pub score: i32,

    pub attempt_date: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'student_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentAnswer {
    pub answer_id: Uuid,
    pub result_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_id: Uuid,
}

/// One picked option for one question.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: Uuid,
    pub selected_option_id: Uuid,
}

/// DTO for submitting an attempt. The score is derived server-side.
#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    /// Used for the inserted row; ignored when the attempt replaces an
    /// earlier one, which keeps its id.
    #[serde(default = "Uuid::new_v4")]
    pub result_id: Uuid,
    pub assessment_id: Uuid,
    pub answers: Vec<AnswerSubmission>,
}

/// DTO for replacing an attempt's answers. The body id must match the
/// path id; the score is recomputed from the new answers.
#[derive(Debug, Deserialize)]
pub struct UpdateResultRequest {
    pub result_id: Uuid,
    pub answers: Vec<AnswerSubmission>,
}

/// Per-question line of the graded report.
#[derive(Debug, Serialize)]
pub struct AnswerReview {
    pub question_id: Uuid,
    pub question_text: String,
    pub selected_option_id: Option<Uuid>,
    pub selected_option_text: Option<String>,
    pub correct_option_id: Option<Uuid>,
    pub correct_option_text: Option<String>,
    pub is_correct: bool,
    pub all_options: Vec<AnswerOption>,
}

/// Graded report for one student's attempt at one assessment.
#[derive(Debug, Serialize)]
pub struct AssessmentReport {
    pub assessment_id: Uuid,
    pub assessment_title: String,
    pub student_id: Uuid,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Fraction correct rendered as "correct/total".
    pub score: String,
    pub attempt_date: chrono::DateTime<chrono::Utc>,
    pub answers: Vec<AnswerReview>,
}
