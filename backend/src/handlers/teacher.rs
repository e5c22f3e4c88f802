// src/handlers/teacher.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    engine::ExamEngine,
    error::AppError,
    models::{
        exam::{CreateExamRequest, Exam, ExamChanges, NewExam, UpdateExamRequest, validate_questions},
        validate_not_blank,
    },
    store::Store,
    utils::jwt::Claims,
};

/// Loads an exam and checks that the caller authored it.
async fn owned_exam(store: &dyn Store, exam_id: i64, teacher_id: i64) -> Result<Exam, AppError> {
    let exam = store
        .find_exam(exam_id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    if exam.owner_id != teacher_id {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    Ok(exam)
}

async fn ensure_category_exists(store: &dyn Store, category_id: i64) -> Result<(), AppError> {
    store
        .find_category(category_id)
        .await?
        .map(|_| ())
        .ok_or(AppError::BadRequest(format!(
            "Category {} does not exist",
            category_id
        )))
}

/// Lists exams created by the current teacher.
pub async fn list_exams(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let exams = store.list_exams_by_owner(claims.user_id()?).await?;
    Ok(Json(exams))
}

/// Creates a new exam owned by the current teacher.
pub async fn create_exam(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category_id = payload
        .category_id
        .ok_or(AppError::BadRequest("Category is required".to_string()))?;
    payload.validate()?;
    ensure_category_exists(store.as_ref(), category_id).await?;

    let exam = store
        .create_exam(NewExam {
            title: payload.title.trim().to_string(),
            category_id,
            duration_minutes: payload.duration_minutes,
            questions: payload.questions,
            owner_id: claims.user_id()?,
        })
        .await?;

    tracing::info!(exam_id = exam.id, owner_id = exam.owner_id, "Exam created");

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Returns one of the current teacher's exams, including answer keys.
pub async fn get_exam(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = owned_exam(store.as_ref(), id, claims.user_id()?).await?;
    Ok(Json(exam))
}

/// Updates an exam. Fields are optional.
///
/// Questions are frozen once any student has attempted the exam: stored answers
/// are option indices and would silently change meaning. The store enforces this
/// and answers with a Conflict.
pub async fn update_exam(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if let Some(title) = &payload.title {
        validate_not_blank(title).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }
    if let Some(questions) = &payload.questions {
        validate_questions(questions).map_err(|e| AppError::BadRequest(e.to_string()))?;
    }

    owned_exam(store.as_ref(), id, claims.user_id()?).await?;

    if let Some(category_id) = payload.category_id {
        ensure_category_exists(store.as_ref(), category_id).await?;
    }

    let exam = store
        .update_exam(
            id,
            ExamChanges {
                title: payload.title.map(|t| t.trim().to_string()),
                category_id: payload.category_id,
                duration_minutes: payload.duration_minutes,
                questions: payload.questions,
            },
        )
        .await?;

    Ok(Json(exam))
}

/// Deletes an exam. Its attempts stay in the ledger.
pub async fn delete_exam(
    State(store): State<Arc<dyn Store>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_exam(store.as_ref(), id, claims.user_id()?).await?;
    store.delete_exam(id).await?;

    tracing::info!(exam_id = id, "Exam deleted");

    Ok(Json(json!({ "message": "Exam deleted" })))
}

/// Dashboard analytics across the current teacher's exams.
pub async fn analytics(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.teacher_analytics(claims.user_id()?).await?))
}

/// Per-student drill-down with question-level review.
pub async fn students_analytics(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.students_analytics(claims.user_id()?).await?))
}
