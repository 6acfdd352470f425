// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub question_id: Uuid,

    pub assessment_id: Uuid,

    /// The text content of the question. Sanitized before storage.
    pub question_text: String,
}

/// Represents the 'options' table in the database.
/// One row per answer choice; `is_correct` is never sent to students
/// during an attempt, only in the post-submission review.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnswerOption {
    pub option_id: Uuid,

    pub question_id: Uuid,

    pub text: String,

    pub is_correct: bool,
}

/// A question with its answer choices attached.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    pub question_id: Uuid,
    pub question_text: String,
    pub options: Vec<AnswerOption>,
}

/// DTO for a question nested inside an assessment payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(default = "Uuid::new_v4")]
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<CreateOptionRequest>,
}

/// DTO for an answer choice nested inside a question payload.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateOptionRequest {
    #[serde(default = "Uuid::new_v4")]
    pub option_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

fn validate_options(options: &[CreateOptionRequest]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.text.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    if !options.iter().any(|o| o.is_correct) {
        return Err(validator::ValidationError::new("no_correct_option"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, is_correct: bool) -> CreateOptionRequest {
        CreateOptionRequest {
            option_id: Uuid::new_v4(),
            text: text.to_string(),
            is_correct,
        }
    }

    #[test]
    fn options_need_at_least_one_correct() {
        assert!(validate_options(&[option("a", false), option("b", false)]).is_err());
        assert!(validate_options(&[option("a", false), option("b", true)]).is_ok());
    }

    #[test]
    fn empty_or_blank_options_are_rejected() {
        assert!(validate_options(&[]).is_err());
        assert!(validate_options(&[option("", true)]).is_err());
    }

    #[test]
    fn overlong_option_text_is_rejected() {
        let long = "x".repeat(501);
        assert!(validate_options(&[option(&long, true)]).is_err());
    }
}
