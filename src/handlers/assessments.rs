// src/handlers/assessments.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        assessment::{Assessment, AssessmentDetail, AssessmentSummary, CreateAssessmentRequest, UpdateAssessmentRequest},
        question::{AnswerOption, CreateQuestionRequest, Question, QuestionDetail},
        result::{AnswerReview, AssessmentReport, QuizResult, StudentAnswer},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Lists every assessment with its full question tree.
pub async fn list_assessments(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let assessments: Vec<Assessment> = sqlx::query_as("SELECT * FROM assessments ORDER BY title")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch assessments: {:?}", e);
            AppError::from(e)
        })?;

    let ids: Vec<Uuid> = assessments.iter().map(|a| a.assessment_id).collect();
    let mut tree = load_question_tree(&pool, &ids).await?;

    let detailed: Vec<AssessmentDetail> = assessments
        .into_iter()
        .map(|a| AssessmentDetail {
            questions: tree.remove(&a.assessment_id).unwrap_or_default(),
            assessment_id: a.assessment_id,
            course_id: a.course_id,
            title: a.title,
            max_score: a.max_score,
        })
        .collect();

    Ok(Json(detailed))
}

pub async fn get_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assessment: Option<Assessment> =
        sqlx::query_as("SELECT * FROM assessments WHERE assessment_id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch assessment {}: {:?}", id, e);
                AppError::from(e)
            })?;

    let assessment =
        assessment.ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let mut tree = load_question_tree(&pool, &[id]).await?;

    Ok(Json(AssessmentDetail {
        questions: tree.remove(&id).unwrap_or_default(),
        assessment_id: assessment.assessment_id,
        course_id: assessment.course_id,
        title: assessment.title,
        max_score: assessment.max_score,
    }))
}

/// Creates an assessment together with its questions and options in one
/// transaction. Question and option text is sanitized before storage.
pub async fn create_assessment(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course: Option<(Uuid,)> = sqlx::query_as("SELECT course_id FROM courses WHERE course_id = $1")
        .bind(payload.course_id)
        .fetch_optional(&pool)
        .await
        .map_err(AppError::from)?;

    if course.is_none() {
        return Err(AppError::BadRequest("Course not found".to_string()));
    }

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    sqlx::query(
        "INSERT INTO assessments (assessment_id, course_id, title, max_score) VALUES ($1, $2, $3, $4)",
    )
    .bind(payload.assessment_id)
    .bind(payload.course_id)
    .bind(&payload.title)
    .bind(payload.max_score)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            AppError::Conflict("Assessment already exists".to_string())
        } else {
            tracing::error!("Failed to create assessment: {:?}", e);
            AppError::from(e)
        }
    })?;

    let questions = insert_question_tree(&mut tx, payload.assessment_id, &payload.questions).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(
        "Created assessment {} ({} questions) for course {}",
        payload.assessment_id,
        questions.len(),
        payload.course_id
    );

    Ok((
        StatusCode::CREATED,
        Json(AssessmentDetail {
            assessment_id: payload.assessment_id,
            course_id: payload.course_id,
            title: payload.title,
            max_score: payload.max_score,
            questions,
        }),
    ))
}

/// Replaces an assessment. The body id must match the path id and the
/// question tree is replaced wholesale, which also discards any stored
/// answers pointing at the old questions.
pub async fn update_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssessmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if id != payload.assessment_id {
        tracing::info!("Assessment id mismatch: {} != {}", id, payload.assessment_id);
        return Err(AppError::BadRequest("Id mismatch".to_string()));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut tx = pool.begin().await.map_err(AppError::from)?;

    let result = sqlx::query(
        "UPDATE assessments SET course_id = $1, title = $2, max_score = $3 WHERE assessment_id = $4",
    )
    .bind(payload.course_id)
    .bind(&payload.title)
    .bind(payload.max_score)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update assessment {}: {:?}", id, e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    sqlx::query("DELETE FROM questions WHERE assessment_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

    insert_question_tree(&mut tx, id, &payload.questions).await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!("Updated assessment {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Deletes an assessment along with its questions, options and results.
pub async fn delete_assessment(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (result_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM results WHERE assessment_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .map_err(AppError::from)?;

    let (question_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM questions WHERE assessment_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .map_err(AppError::from)?;

    let result = sqlx::query("DELETE FROM assessments WHERE assessment_id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete assessment {}: {:?}", id, e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        tracing::info!("Assessment {} not found for deletion", id);
        return Err(AppError::NotFound("Assessment not found".to_string()));
    }

    tracing::info!(
        "Deleted assessment {} ({} results, {} questions)",
        id,
        result_count,
        question_count
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Lists assessments of one course as summaries with question counts.
pub async fn assessments_by_course(
    State(pool): State<PgPool>,
    Path(course_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let course: Option<(Uuid,)> = sqlx::query_as("SELECT course_id FROM courses WHERE course_id = $1")
        .bind(course_id)
        .fetch_optional(&pool)
        .await
        .map_err(AppError::from)?;

    if course.is_none() {
        tracing::info!("Course {} not found", course_id);
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let summaries: Vec<AssessmentSummary> = sqlx::query_as(
        r#"
        SELECT a.assessment_id, a.title, a.max_score, COUNT(q.question_id) AS question_count
        FROM assessments a
        LEFT JOIN questions q ON q.assessment_id = a.assessment_id
        WHERE a.course_id = $1
        GROUP BY a.assessment_id, a.title, a.max_score
        ORDER BY a.title
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch assessments for course {}: {:?}", course_id, e);
        AppError::from(e)
    })?;

    tracing::info!("Found {} assessments for course {}", summaries.len(), course_id);

    Ok(Json(summaries))
}

/// Builds the graded report for one student's attempt: every question
/// with the picked option, the correct option and the full choice list.
/// Students can only read their own report; instructors and admins
/// can read anyone's.
pub async fn assessment_result(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((assessment_id, student_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.can_access(student_id) {
        return Err(AppError::Forbidden(
            "You can only view your own results".to_string(),
        ));
    }

    let assessment: Option<Assessment> =
        sqlx::query_as("SELECT * FROM assessments WHERE assessment_id = $1")
            .bind(assessment_id)
            .fetch_optional(&pool)
            .await
            .map_err(AppError::from)?;

    let assessment =
        assessment.ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let result: Option<QuizResult> =
        sqlx::query_as("SELECT * FROM results WHERE assessment_id = $1 AND user_id = $2")
            .bind(assessment_id)
            .bind(student_id)
            .fetch_optional(&pool)
            .await
            .map_err(AppError::from)?;

    let result = result.ok_or_else(|| {
        AppError::NotFound("No result found for this student and assessment".to_string())
    })?;

    let answers: Vec<StudentAnswer> =
        sqlx::query_as("SELECT * FROM student_answers WHERE result_id = $1")
            .bind(result.result_id)
            .fetch_all(&pool)
            .await
            .map_err(AppError::from)?;

    let mut tree = load_question_tree(&pool, &[assessment_id]).await?;
    let questions = tree.remove(&assessment_id).unwrap_or_default();

    Ok(Json(build_report(&assessment, student_id, &result, questions, &answers)))
}

/// Loads questions and options for a set of assessments and groups them
/// per assessment.
async fn load_question_tree(
    pool: &PgPool,
    assessment_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<QuestionDetail>>, AppError> {
    if assessment_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let questions: Vec<Question> = sqlx::query_as(
        "SELECT * FROM questions WHERE assessment_id = ANY($1) ORDER BY question_id",
    )
    .bind(assessment_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions: {:?}", e);
        AppError::from(e)
    })?;

    let question_ids: Vec<Uuid> = questions.iter().map(|q| q.question_id).collect();

    let options: Vec<AnswerOption> = if question_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as("SELECT * FROM options WHERE question_id = ANY($1) ORDER BY option_id")
            .bind(&question_ids)
            .fetch_all(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch options: {:?}", e);
                AppError::from(e)
            })?
    };

    let mut options_by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        options_by_question
            .entry(option.question_id)
            .or_default()
            .push(option);
    }

    let mut tree: HashMap<Uuid, Vec<QuestionDetail>> = HashMap::new();
    for question in questions {
        let detail = QuestionDetail {
            options: options_by_question
                .remove(&question.question_id)
                .unwrap_or_default(),
            question_id: question.question_id,
            question_text: question.question_text,
        };
        tree.entry(question.assessment_id).or_default().push(detail);
    }

    Ok(tree)
}

/// Inserts a question tree under an assessment and returns the stored
/// (sanitized) shape for the response body.
async fn insert_question_tree(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    assessment_id: Uuid,
    questions: &[CreateQuestionRequest],
) -> Result<Vec<QuestionDetail>, AppError> {
    let mut details = Vec::with_capacity(questions.len());

    for question in questions {
        let question_text = clean_html(&question.question_text);

        sqlx::query(
            "INSERT INTO questions (question_id, assessment_id, question_text) VALUES ($1, $2, $3)",
        )
        .bind(question.question_id)
        .bind(assessment_id)
        .bind(&question_text)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Conflict("Duplicate question id".to_string())
            } else {
                tracing::error!("Failed to insert question: {:?}", e);
                AppError::from(e)
            }
        })?;

        let mut stored_options = Vec::with_capacity(question.options.len());
        for option in &question.options {
            let text = clean_html(&option.text);

            sqlx::query(
                "INSERT INTO options (option_id, question_id, text, is_correct) VALUES ($1, $2, $3, $4)",
            )
            .bind(option.option_id)
            .bind(question.question_id)
            .bind(&text)
            .bind(option.is_correct)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                    AppError::Conflict("Duplicate option id".to_string())
                } else {
                    tracing::error!("Failed to insert option: {:?}", e);
                    AppError::from(e)
                }
            })?;

            stored_options.push(AnswerOption {
                option_id: option.option_id,
                question_id: question.question_id,
                text,
                is_correct: option.is_correct,
            });
        }

        details.push(QuestionDetail {
            question_id: question.question_id,
            question_text,
            options: stored_options,
        });
    }

    Ok(details)
}

/// Assembles the graded report from stored rows. A question without a
/// stored answer, or whose stored answer no longer matches any option,
/// counts as incorrect; the totals are re-derived rather than read from
/// the result row.
fn build_report(
    assessment: &Assessment,
    student_id: Uuid,
    result: &QuizResult,
    questions: Vec<QuestionDetail>,
    answers: &[StudentAnswer],
) -> AssessmentReport {
    let reviews: Vec<AnswerReview> = questions
        .into_iter()
        .map(|question| {
            let stored = answers
                .iter()
                .find(|a| a.question_id == question.question_id);
            let selected = stored.and_then(|sa| {
                question
                    .options
                    .iter()
                    .find(|o| o.option_id == sa.selected_option_id)
            });
            let correct = question.options.iter().find(|o| o.is_correct);

            AnswerReview {
                question_id: question.question_id,
                question_text: question.question_text.clone(),
                selected_option_id: stored.map(|sa| sa.selected_option_id),
                selected_option_text: selected.map(|o| o.text.clone()),
                correct_option_id: correct.map(|o| o.option_id),
                correct_option_text: correct.map(|o| o.text.clone()),
                is_correct: selected.map(|o| o.is_correct).unwrap_or(false),
                all_options: question.options,
            }
        })
        .collect();

    let total_questions = reviews.len();
    let correct_answers = reviews.iter().filter(|r| r.is_correct).count();

    AssessmentReport {
        assessment_id: assessment.assessment_id,
        assessment_title: assessment.title.clone(),
        student_id,
        total_questions,
        correct_answers,
        score: format!("{}/{}", correct_answers, total_questions),
        attempt_date: result.attempt_date,
        answers: reviews,
    }
}
