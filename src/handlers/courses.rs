// src/handlers/courses.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::course::{Course, CourseWithInstructor, CreateCourseRequest, UpdateCourseRequest},
    utils::{html::clean_html, jwt::Claims},
};

/// Lists every course with the instructor's name joined in.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses: Vec<CourseWithInstructor> = sqlx::query_as(
        r#"
        SELECT c.*, u.name AS instructor_name
        FROM courses c
        JOIN users u ON u.user_id = c.instructor_id
        ORDER BY c.created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch courses: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(courses))
}

pub async fn get_course(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE course_id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch course {}: {:?}", id, e);
            AppError::from(e)
        })?;

    let course = course.ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Creates a course. The description is sanitized and YouTube watch
/// links are rewritten to their embeddable form before storage.
pub async fn create_course(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let instructor: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM users WHERE user_id = $1")
            .bind(payload.instructor_id)
            .fetch_optional(&pool)
            .await
            .map_err(AppError::from)?;

    if instructor.is_none() {
        return Err(AppError::BadRequest("Instructor not found".to_string()));
    }

    let description = clean_html(&payload.description);
    let course_url = payload.course_url.as_deref().map(normalize_course_url);

    let course: Course = sqlx::query_as(
        r#"
        INSERT INTO courses (course_id, title, description, instructor_id, media_url, course_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.course_id)
    .bind(&payload.title)
    .bind(&description)
    .bind(payload.instructor_id)
    .bind(&payload.media_url)
    .bind(&course_url)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("Course already exists".to_string())
        } else {
            tracing::error!("Failed to create course: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Created course {} by instructor {}", course.course_id, course.instructor_id);

    Ok((StatusCode::CREATED, Json(course)))
}

/// Replaces a course. The body id must match the path id.
pub async fn update_course(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id != payload.course_id {
        tracing::info!("Course id mismatch: {} != {}", id, payload.course_id);
        return Err(AppError::BadRequest("Id mismatch".to_string()));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let description = clean_html(&payload.description);
    let course_url = payload.course_url.as_deref().map(normalize_course_url);

    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = $1, description = $2, instructor_id = $3, media_url = $4, course_url = $5
        WHERE course_id = $6
        "#,
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(payload.instructor_id)
    .bind(&payload.media_url)
    .bind(&course_url)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update course {}: {:?}", id, e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    tracing::info!("Updated course {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a course. Assessments, enrollments and results go with it.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE course_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete course {}: {:?}", id, e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        tracing::info!("Course {} not found for deletion", id);
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    tracing::info!("Deleted course {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the courses owned by the calling instructor.
pub async fn instructor_courses(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let instructor_id = claims.user_id()?;

    let courses: Vec<Course> =
        sqlx::query_as("SELECT * FROM courses WHERE instructor_id = $1 ORDER BY created_at DESC")
            .bind(instructor_id)
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch instructor courses: {:?}", e);
                AppError::from(e)
            })?;

    Ok(Json(courses))
}

/// Lists the courses the calling user is enrolled in.
pub async fn enrolled_courses(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let courses: Vec<Course> = sqlx::query_as(
        r#"
        SELECT c.*
        FROM courses c
        JOIN enrollments e ON e.course_id = c.course_id
        WHERE e.user_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch enrolled courses: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(courses))
}

/// Rewrites YouTube watch links ('watch?v=' and 'youtu.be') to the
/// embed form the frontend player expects. Anything else, including
/// unparseable input, passes through unchanged.
fn normalize_course_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    let host = parsed.host_str().unwrap_or("");

    if matches!(host, "youtube.com" | "www.youtube.com" | "m.youtube.com")
        && parsed.path() == "/watch"
    {
        if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "v") {
            if !id.is_empty() {
                return format!("https://www.youtube.com/embed/{}", id);
            }
        }
    }

    if host == "youtu.be" {
        let id = parsed.path().trim_start_matches('/');
        if !id.is_empty() && !id.contains('/') {
            return format!("https://www.youtube.com/embed/{}", id);
        }
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_links_become_embed_links() {
        assert_eq!(
            normalize_course_url("https://youtube.com/watch?v=abc123"),
            "https://www.youtube.com/embed/abc123"
        );
        assert_eq!(
            normalize_course_url("https://www.youtube.com/watch?v=abc123&t=42s"),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn short_links_become_embed_links() {
        assert_eq!(
            normalize_course_url("https://youtu.be/abc123"),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn embed_links_pass_through() {
        assert_eq!(
            normalize_course_url("https://www.youtube.com/embed/abc123"),
            "https://www.youtube.com/embed/abc123"
        );
    }

    #[test]
    fn non_youtube_input_passes_through() {
        assert_eq!(
            normalize_course_url("https://vimeo.com/12345"),
            "https://vimeo.com/12345"
        );
        assert_eq!(normalize_course_url("new media"), "new media");
        assert_eq!(
            normalize_course_url("https://youtube.com/watch?list=xyz"),
            "https://youtube.com/watch?list=xyz"
        );
    }
}
