use axum::{extract::Path, Json};
use serde::Serialize;

use crate::{extractors::CurrentUser, AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: u64,
    pub requested_by: String,
}

/// GET /api/users/:id
pub async fn get_user(Path(id): Path<String>, auth: CurrentUser) -> AppResult<Json<UserResponse>> {
    let id = id
        .parse::<u64>()
        .map_err(|_| AppError::BadRequest(format!("User id must be numeric, got {:?}", id)))?;

    Ok(Json(UserResponse {
        id,
        requested_by: auth.name,
    }))
}
