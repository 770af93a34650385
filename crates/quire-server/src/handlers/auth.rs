//! Authentication-related handlers

use axum::{Extension, Json};

use crate::{AppError, Caller};
use quire_core::UserProfile;

/// GET /api/me - Profile of the signed-in user
pub async fn get_me(Extension(caller): Extension<Caller>) -> Result<Json<UserProfile>, AppError> {
    let principal = caller.require()?;
    Ok(Json(UserProfile::from_principal(principal)))
}
