// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub course_id: Uuid,

    pub title: String,

    /// Rich text, sanitized before storage.
    pub description: String,

    /// Owning instructor. Courses go away with their instructor.
    pub instructor_id: Uuid,

    pub media_url: Option<String>,

    /// Lecture link. YouTube watch links are normalized to embed form.
    pub course_url: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Course row with the instructor's name joined in, as served by the
/// course listing.
#[derive(Debug, Serialize, FromRow)]
pub struct CourseWithInstructor {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    pub instructor_id: Uuid,
    pub instructor_name: String,
    pub media_url: Option<String>,
    pub course_url: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[serde(default = "Uuid::new_v4")]
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub description: String,
    pub instructor_id: Uuid,
    #[validate(length(max = 500))]
    pub media_url: Option<String>,
    #[validate(length(max = 500))]
    pub course_url: Option<String>,
}

/// DTO for replacing a course. The body id must match the path id.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub description: String,
    pub instructor_id: Uuid,
    #[validate(length(max = 500))]
    pub media_url: Option<String>,
    #[validate(length(max = 500))]
    pub course_url: Option<String>,
}
