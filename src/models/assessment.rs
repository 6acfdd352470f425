// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::question::{CreateQuestionRequest, QuestionDetail};

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Assessment {
    pub assessment_id: Uuid,

    pub course_id: Uuid,

    pub title: String,

    /// Display ceiling used by the client; the stored score counts
    /// correct answers and is capped by the question count instead.
    pub max_score: i32,
}

/// An assessment with its full question tree attached.
#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    pub assessment_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub max_score: i32,
    pub questions: Vec<QuestionDetail>,
}

/// Row shape for the per-course listing.
#[derive(Debug, FromRow, Serialize)]
pub struct AssessmentSummary {
    pub assessment_id: Uuid,
    pub title: String,
    pub max_score: i32,
    pub question_count: i64,
}

/// DTO for creating an assessment together with its question tree.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[serde(default = "Uuid::new_v4")]
    pub assessment_id: Uuid,
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_score: i32,
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for replacing an assessment. The body id must match the path id
/// and the question tree is replaced wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAssessmentRequest {
    pub assessment_id: Uuid,
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 1000))]
    pub max_score: i32,
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}
