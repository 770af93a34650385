//! Magazine handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{AppError, AppState, Caller};
use quire_core::{Magazine, MagazineSummary, NewMagazine};

/// Query params for listing magazines
#[derive(Debug, Deserialize)]
pub struct ListMagazinesQuery {
    /// Filter by category
    pub category: Option<String>,
}

/// GET /api/magazines - List magazines (public)
pub async fn list_magazines(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMagazinesQuery>,
) -> Result<Json<Vec<MagazineSummary>>, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let magazines = state.db.list_magazines(category)?;
    Ok(Json(magazines))
}

/// GET /api/magazines/:id - Read a magazine (subscribers only)
pub async fn get_magazine(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<i64>,
) -> Result<Json<Magazine>, AppError> {
    let principal = caller.require()?;

    let subscription = state.db.subscription_state(&principal.id, Utc::now())?;
    if !subscription.active {
        return Err(AppError::forbidden("An active subscription is required"));
    }

    let magazine = state
        .db
        .get_magazine(id)?
        .ok_or_else(|| AppError::not_found("Magazine not found"))?;

    // Audit log - read access
    state.db.log_audit(
        &principal.id,
        "read",
        Some("magazine"),
        Some(&id.to_string()),
        None,
    )?;

    Ok(Json(magazine))
}

/// POST /api/magazines - Publish a magazine
pub async fn create_magazine(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<NewMagazine>, JsonRejection>,
) -> Result<Json<Magazine>, AppError> {
    let principal = caller.require()?;
    let Json(new_magazine) = payload?;

    let magazine = state.db.create_magazine(&principal.id, &new_magazine)?;

    // Audit log
    state.db.log_audit(
        &principal.id,
        "create",
        Some("magazine"),
        Some(&magazine.id.to_string()),
        Some(&format!("category={}", magazine.category)),
    )?;

    Ok(Json(magazine))
}
