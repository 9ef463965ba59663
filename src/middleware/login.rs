use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::{
    config::ApiToken,
    extractors::{extract_token, CurrentUser},
    AppError, AppState,
};

/// Middleware that resolves the session token into a [`CurrentUser`]
pub async fn login_required(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        AppError::Unauthorized(
            "Missing authentication: no session cookie or Authorization header".to_string(),
        )
    })?;

    let user = resolve_user(&state.config.api_tokens, &token).ok_or_else(|| {
        tracing::warn!("Rejected request with unknown session token");
        AppError::Unauthorized("Invalid session token".to_string())
    })?;

    tracing::debug!(user = %user.name, "Session resolved");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Every configured token is compared in constant time, matched or not.
fn resolve_user(tokens: &[ApiToken], provided: &str) -> Option<CurrentUser> {
    let mut found = None;
    for entry in tokens {
        if bool::from(entry.token.as_bytes().ct_eq(provided.as_bytes())) && found.is_none() {
            found = Some(CurrentUser {
                name: entry.user.clone(),
            });
        }
    }
    found
}

/// Middleware that requires a valid X-Metrics-Key header when a metrics key is configured
pub async fn require_metrics_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected_key) = state.config.metrics_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided_key = request
        .headers()
        .get("X-Metrics-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Metrics-Key header".to_string()))?;

    if expected_key.as_bytes().ct_eq(provided_key.as_bytes()).into() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Unauthorized metrics scrape attempt");
        Err(AppError::Unauthorized("Invalid metrics key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Vec<ApiToken> {
        vec![
            ApiToken {
                user: "alice".into(),
                token: "a-token".into(),
            },
            ApiToken {
                user: "bob".into(),
                token: "b-token".into(),
            },
        ]
    }

    #[test]
    fn resolves_known_token() {
        assert_eq!(resolve_user(&tokens(), "b-token").unwrap().name, "bob");
    }

    #[test]
    fn rejects_unknown_or_partial_token() {
        assert!(resolve_user(&tokens(), "b-tok").is_none());
        assert!(resolve_user(&tokens(), "").is_none());
        assert!(resolve_user(&[], "a-token").is_none());
    }
}
