// src/handlers/student.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    engine::ExamEngine, error::AppError, models::attempt::SubmitExamRequest, utils::jwt::Claims,
};

/// Lists every exam (answer keys hidden) with this student's attempt status.
pub async fn list_exams(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.catalogue(claims.user_id()?, Utc::now()).await?))
}

/// Returns an exam for taking, or 403 with `retryAfterMinutes` while locked.
pub async fn get_exam(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.open_exam(claims.user_id()?, id, Utc::now()).await?))
}

/// Attempt status for the pre-attempt screen.
pub async fn exam_status(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.gate_status(claims.user_id()?, id, Utc::now()).await?))
}

/// Submits answers for scoring.
///
/// The attempt gate is re-checked here regardless of what the exam fetch said;
/// the client-side timer is advisory only.
pub async fn submit_exam(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = engine
        .submit(claims.user_id()?, id, req.answers, Utc::now())
        .await?;
    Ok(Json(receipt))
}

/// The student's results, newest first.
pub async fn list_results(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.student_results(claims.user_id()?).await?))
}

/// Question-level review of one result.
pub async fn get_result(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.result_detail(claims.user_id()?, id).await?))
}

/// Per-subject analytics.
pub async fn analytics(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.student_analytics(claims.user_id()?).await?))
}

/// Every attempt with its question-level review.
pub async fn analytics_details(
    State(engine): State<ExamEngine>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(engine.student_analytics_details(claims.user_id()?).await?))
}
