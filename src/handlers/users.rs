// src/handlers/users.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, UpdateUserRequest, User},
    utils::hash::hash_password,
};

/// Lists every user. Credentials never leave the row type.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch users: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!("Retrieved {} users", users.len());

    Ok(Json(users))
}

pub async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE user_id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user {}: {:?}", id, e);
            AppError::from(e)
        })?;

    let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates a user through the management endpoint, optionally enrolling
/// it into existing courses in the same transaction. Unknown course ids
/// are silently dropped.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let credential = hash_password(&payload.password)?;

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (user_id, name, email, role, password_hash, password_salt)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(payload.user_id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.role)
    .bind(&credential.hash)
    .bind(&credential.salt)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("User already exists".to_string())
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::from(e)
        }
    })?;

    if let Some(course_ids) = payload.course_ids.filter(|ids| !ids.is_empty()) {
        let existing: Vec<(Uuid,)> =
            sqlx::query_as("SELECT course_id FROM courses WHERE course_id = ANY($1)")
                .bind(&course_ids)
                .fetch_all(&mut *tx)
                .await
                .map_err(AppError::from)?;

        for (course_id,) in &existing {
            sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2)")
                .bind(user.user_id)
                .bind(course_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::from)?;
        }

        tracing::info!("Enrolled new user {} in {} courses", user.user_id, existing.len());
    }

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!("Created user {} ({})", user.user_id, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Replaces a user's profile fields. The body id must match the path id.
/// A password in the payload is rehashed; otherwise the stored credential
/// is left untouched.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id != payload.user_id {
        tracing::info!("User id mismatch: {} != {}", id, payload.user_id);
        return Err(AppError::BadRequest("Id mismatch".to_string()));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let result = match &payload.password {
        Some(password) => {
            let credential = hash_password(password)?;
            sqlx::query(
                r#"
                UPDATE users
                SET name = $1, email = $2, role = $3, password_hash = $4, password_salt = $5
                WHERE user_id = $6
                "#,
            )
            .bind(&payload.name)
            .bind(&payload.email)
            .bind(&payload.role)
            .bind(&credential.hash)
            .bind(&credential.salt)
            .bind(id)
            .execute(&pool)
            .await
        }
        None => {
            sqlx::query("UPDATE users SET name = $1, email = $2, role = $3 WHERE user_id = $4")
                .bind(&payload.name)
                .bind(&payload.email)
                .bind(&payload.role)
                .bind(id)
                .execute(&pool)
                .await
        }
    }
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("Email already in use".to_string())
        } else {
            tracing::error!("Failed to update user {}: {:?}", id, e);
            AppError::from(e)
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Updated user {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes a user. Enrollments, owned courses and results go with it.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user {}: {:?}", id, e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        tracing::info!("User {} not found for deletion", id);
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("Deleted user {}", id);

    Ok(StatusCode::NO_CONTENT)
}
