// src/handlers/results.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::result::{AnswerSubmission, QuizResult, SubmitResultRequest, UpdateResultRequest},
    utils::jwt::Claims,
};

/// Helper row for fetching the answer key of an assessment.
#[derive(sqlx::FromRow)]
struct OptionFlag {
    question_id: Uuid,
    option_id: Uuid,
    is_correct: bool,
}

/// Lists results. Students see their own attempts, instructors and
/// admins see everyone's.
pub async fn list_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results: Vec<QuizResult> = if claims.is_elevated() {
        sqlx::query_as("SELECT * FROM results ORDER BY attempt_date DESC")
            .fetch_all(&pool)
            .await
    } else {
        sqlx::query_as("SELECT * FROM results WHERE user_id = $1 ORDER BY attempt_date DESC")
            .bind(claims.user_id()?)
            .fetch_all(&pool)
            .await
    }
    .map_err(|e| {
        tracing::error!("Failed to fetch results: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(results))
}

pub async fn get_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result: Option<QuizResult> = sqlx::query_as("SELECT * FROM results WHERE result_id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch result {}: {:?}", id, e);
            AppError::from(e)
        })?;

    let result = result.ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;

    if !claims.can_access(result.user_id) {
        return Err(AppError::Forbidden(
            "You can only view your own results".to_string(),
        ));
    }

    Ok(Json(result))
}

/// Records the calling student's attempt at an assessment.
///
/// The score is derived here by matching each submitted answer against
/// the question's correct option; it is never taken from the client.
/// A second attempt at the same assessment replaces the first.
pub async fn submit_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let user_id = claims.user_id()?;

    let assessment: Option<(Uuid,)> =
        sqlx::query_as("SELECT assessment_id FROM assessments WHERE assessment_id = $1")
            .bind(payload.assessment_id)
            .fetch_optional(&pool)
            .await
            .map_err(AppError::from)?;

    if assessment.is_none() {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    let (known_questions, option_flags) = load_answer_key(&pool, payload.assessment_id).await?;

    // Answers pointing outside the assessment are dropped rather than
    // stored; they could never score anyway.
    let mut answers = fold_answers(&payload.answers);
    answers.retain(|question_id, _| known_questions.contains(question_id));

    let score = score_submission(&option_flags, &answers);

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let result: QuizResult = sqlx::query_as(
        r#"
        INSERT INTO results (result_id, user_id, assessment_id, score, attempt_date)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, assessment_id)
        DO UPDATE SET score = EXCLUDED.score, attempt_date = EXCLUDED.attempt_date
        RETURNING *
        "#,
    )
    .bind(payload.result_id)
    .bind(user_id)
    .bind(payload.assessment_id)
    .bind(score)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert result: {:?}", e);
        AppError::from(e)
    })?;

    replace_answers(&mut tx, result.result_id, &answers).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(
        "Recorded result {} for user {} on assessment {}: score {}",
        result.result_id,
        user_id,
        payload.assessment_id,
        score
    );

    Ok((StatusCode::CREATED, Json(result)))
}

/// Replaces an attempt's answers and recomputes its score. The body id
/// must match the path id.
pub async fn update_result(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id != payload.result_id {
        tracing::info!("Result id mismatch: {} != {}", id, payload.result_id);
        return Err(AppError::BadRequest("Id mismatch".to_string()));
    }

    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let result: Option<QuizResult> = sqlx::query_as("SELECT * FROM results WHERE result_id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(AppError::from)?;

    let result = result.ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;

    let (known_questions, option_flags) = load_answer_key(&pool, result.assessment_id).await?;

    let mut answers = fold_answers(&payload.answers);
    answers.retain(|question_id, _| known_questions.contains(question_id));

    let score = score_submission(&option_flags, &answers);

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    sqlx::query("UPDATE results SET score = $1, attempt_date = $2 WHERE result_id = $3")
        .bind(score)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update result {}: {:?}", id, e);
            AppError::from(e)
        })?;

    replace_answers(&mut tx, id, &answers).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!("Updated result {}: score {}", id, score);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_result(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM results WHERE result_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete result {}: {:?}", id, e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    tracing::info!("Deleted result {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Loads an assessment's question ids and per-option correctness flags.
async fn load_answer_key(
    pool: &PgPool,
    assessment_id: Uuid,
) -> Result<(HashSet<Uuid>, HashMap<(Uuid, Uuid), bool>), AppError> {
    let questions: Vec<(Uuid,)> =
        sqlx::query_as("SELECT question_id FROM questions WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch questions for scoring: {:?}", e);
                AppError::from(e)
            })?;

    let flags: Vec<OptionFlag> = sqlx::query_as(
        r#"
        SELECT o.question_id, o.option_id, o.is_correct
        FROM options o
        JOIN questions q ON q.question_id = o.question_id
        WHERE q.assessment_id = $1
        "#,
    )
    .bind(assessment_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch answer key: {:?}", e);
        AppError::from(e)
    })?;

    let known = questions.into_iter().map(|(id,)| id).collect();
    let option_flags = flags
        .into_iter()
        .map(|f| ((f.question_id, f.option_id), f.is_correct))
        .collect();

    Ok((known, option_flags))
}

/// Rewrites the stored answers of a result inside a transaction.
async fn replace_answers(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    result_id: Uuid,
    answers: &HashMap<Uuid, Uuid>,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM student_answers WHERE result_id = $1")
        .bind(result_id)
        .execute(&mut **tx)
        .await
        .map_err(AppError::from)?;

    for (question_id, selected_option_id) in answers {
        sqlx::query(
            r#"
            INSERT INTO student_answers (answer_id, result_id, question_id, selected_option_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(result_id)
        .bind(question_id)
        .bind(selected_option_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store answer: {:?}", e);
            AppError::from(e)
        })?;
    }

    Ok(())
}

/// Collapses a submission to one picked option per question. When a
/// question appears more than once the last entry wins.
fn fold_answers(answers: &[AnswerSubmission]) -> HashMap<Uuid, Uuid> {
    answers
        .iter()
        .map(|a| (a.question_id, a.selected_option_id))
        .collect()
}

/// Score is the count of questions whose picked option is flagged
/// correct. Unknown questions and unknown options score nothing.
fn score_submission(option_flags: &HashMap<(Uuid, Uuid), bool>, answers: &HashMap<Uuid, Uuid>) -> i32 {
    answers
        .iter()
        .filter(|(question_id, option_id)| {
            option_flags
                .get(&(**question_id, **option_id))
                .copied()
                .unwrap_or(false)
        })
        .count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Key {
        q1: Uuid,
        q1_right: Uuid,
        q1_wrong: Uuid,
        q2: Uuid,
        q2_right: Uuid,
        flags: HashMap<(Uuid, Uuid), bool>,
    }

    fn key() -> Key {
        let q1 = Uuid::new_v4();
        let q1_right = Uuid::new_v4();
        let q1_wrong = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let q2_right = Uuid::new_v4();
        let q2_wrong = Uuid::new_v4();

        let mut flags = HashMap::new();
        flags.insert((q1, q1_right), true);
        flags.insert((q1, q1_wrong), false);
        flags.insert((q2, q2_right), true);
        flags.insert((q2, q2_wrong), false);

        Key {
            q1,
            q1_right,
            q1_wrong,
            q2,
            q2_right,
            flags,
        }
    }

    #[test]
    fn all_correct_scores_full() {
        let k = key();
        let answers = HashMap::from([(k.q1, k.q1_right), (k.q2, k.q2_right)]);
        assert_eq!(score_submission(&k.flags, &answers), 2);
    }

    #[test]
    fn wrong_option_scores_nothing() {
        let k = key();
        let answers = HashMap::from([(k.q1, k.q1_wrong), (k.q2, k.q2_right)]);
        assert_eq!(score_submission(&k.flags, &answers), 1);
    }

    #[test]
    fn unknown_question_or_option_is_ignored() {
        let k = key();
        let answers = HashMap::from([(Uuid::new_v4(), k.q1_right), (k.q1, Uuid::new_v4())]);
        assert_eq!(score_submission(&k.flags, &answers), 0);
    }

    #[test]
    fn empty_submission_scores_zero() {
        let k = key();
        assert_eq!(score_submission(&k.flags, &HashMap::new()), 0);
    }

    #[test]
    fn duplicate_answers_keep_the_last_pick() {
        let k = key();
        let submissions = vec![
            AnswerSubmission {
                question_id: k.q1,
                selected_option_id: k.q1_right,
            },
            AnswerSubmission {
                question_id: k.q1,
                selected_option_id: k.q1_wrong,
            },
        ];

        let folded = fold_answers(&submissions);
        assert_eq!(folded.len(), 1);
        assert_eq!(folded[&k.q1], k.q1_wrong);
        assert_eq!(score_submission(&k.flags, &folded), 0);
    }
}
