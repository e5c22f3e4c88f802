// src/handlers/categories.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{error::AppError, models::category::CreateCategoryRequest, store::Store};

/// Lists every subject, alphabetically.
pub async fn list_categories(
    State(store): State<Arc<dyn Store>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_categories().await?))
}

/// Creates a subject, or returns the existing one with the same name.
/// Teacher only.
pub async fn create_category(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = store.ensure_category(payload.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
