use axum::Json;

use crate::extractors::CurrentUser;

/// GET /api/self
pub async fn get_self(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}
