use axum::response::Redirect;

/// Catch-all for paths the API does not serve
pub async fn redirect_unserved() -> Redirect {
    Redirect::permanent("/api/self")
}
