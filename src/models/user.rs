// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const ROLE_STUDENT: &str = "Student";
pub const ROLE_INSTRUCTOR: &str = "Instructor";
pub const ROLE_ADMIN: &str = "Admin";

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: Uuid,

    pub name: String,

    /// Unique email, also the login identifier.
    pub email: String,

    /// User role: 'Student', 'Instructor' or 'Admin'.
    pub role: String,

    /// Base64 HMAC-SHA512 digest (or a legacy unsalted SHA-512 digest).
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    /// Base64 HMAC key. NULL marks a legacy unsalted digest.
    #[serde(skip)]
    pub password_salt: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for self-service registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "Email must be a valid address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    /// Defaults to 'Student' when omitted.
    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for creating a user through the management endpoint.
/// Unlike registration, the caller picks the role and may enroll the
/// new user into existing courses in the same request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default = "Uuid::new_v4")]
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = validate_role))]
    pub role: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub course_ids: Option<Vec<Uuid>>,
}

/// DTO for replacing a user. The body id must match the path id.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = validate_role))]
    pub role: String,
    /// When present the credential is rehashed; otherwise it is kept.
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    match role {
        ROLE_STUDENT | ROLE_INSTRUCTOR | ROLE_ADMIN => Ok(()),
        _ => Err(validator::ValidationError::new("unknown_role")),
    }
}
