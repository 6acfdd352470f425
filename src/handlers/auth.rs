// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, ROLE_STUDENT, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_legacy_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new user.
///
/// Hashes the password with a fresh salt before storing it.
/// Returns 201 Created and the user object (excluding credentials).
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Registration lookup failed: {:?}", e);
            AppError::from(e)
        })?;

    if existing.is_some() {
        tracing::info!("Registration rejected, email already taken: {}", payload.email);
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let credential = hash_password(&payload.password)?;
    let role = payload.role.as_deref().unwrap_or(ROLE_STUDENT);

    let user: User = sqlx::query_as(
        r#"
        INSERT INTO users (user_id, name, email, role, password_hash, password_salt)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(role)
    .bind(&credential.hash)
    .bind(&credential.salt)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Lost a race against a concurrent registration for the same email
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::BadRequest("User already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("User registered: {} ({})", user.user_id, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database. Accounts still
/// carrying a legacy unsalted digest are verified against it and then
/// rewritten to the salted form in place. If valid, signs a JWT carrying
/// the user's id, email and role.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = user.ok_or_else(|| {
        tracing::info!("Login failed, no such user: {}", payload.email);
        AppError::BadRequest("User not found".to_string())
    })?;

    if user.password_hash.is_empty() {
        return Err(AppError::BadRequest(
            "Invalid user account. Please register again.".to_string(),
        ));
    }

    match user.password_salt.as_deref() {
        Some(salt) if !salt.is_empty() => {
            if !verify_password(&payload.password, &user.password_hash, salt)? {
                tracing::info!("Login failed, wrong password: {}", payload.email);
                return Err(AppError::BadRequest("Wrong password".to_string()));
            }
        }
        _ => {
            // Account predates salting
            if !verify_legacy_password(&payload.password, &user.password_hash)? {
                tracing::info!("Login failed, wrong password (legacy): {}", payload.email);
                return Err(AppError::BadRequest("Wrong password".to_string()));
            }

            let credential = hash_password(&payload.password)?;
            sqlx::query("UPDATE users SET password_hash = $1, password_salt = $2 WHERE user_id = $3")
                .bind(&credential.hash)
                .bind(&credential.salt)
                .bind(user.user_id)
                .execute(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to migrate legacy credential: {:?}", e);
                    AppError::from(e)
                })?;

            tracing::info!("Migrated legacy credential for user {}", user.user_id);
        }
    }

    let token = sign_jwt(user.user_id, &user.email, &user.role, &config)?;

    tracing::info!("User logged in: {} ({})", user.user_id, user.role);

    Ok(Json(json!({
        "token": token,
        "user": {
            "user_id": user.user_id,
            "name": user.name,
            "email": user.email,
            "role": user.role
        }
    })))
}
