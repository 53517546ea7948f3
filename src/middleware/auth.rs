use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::AuthUser;
use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Value looked up when the request carries no Authorization header; never a valid token
const MISSING_TOKEN: &str = "NOT_FOUND";

/// Resolve the bearer token to a principal and attach it to the request
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers);

    let auth_user = state.users().verify(token).await.map_err(|e| {
        tracing::debug!("Authentication failed: {}", e);
        ApiError::unauthorized("Unauthorized")
    })?;
    tracing::debug!("Authenticated user {} ({})", auth_user.id, auth_user.role);

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Reject principals whose role is not `required`. Runs after `authenticate`.
pub async fn require_role(
    State(required): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth_user) = request.extensions().get::<AuthUser>().copied() else {
        return Err(ApiError::unauthorized("Unauthorized"));
    };
    if auth_user.role != required {
        tracing::warn!("User {} with role {} denied {} route", auth_user.id, auth_user.role, required);
        return Err(ApiError::forbidden("Forbidden"));
    }
    Ok(next.run(request).await)
}

/// Authorization header value with an optional `Bearer ` prefix removed
fn extract_token(headers: &HeaderMap) -> &str {
    let raw = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(MISSING_TOKEN)
        .trim();
    raw.strip_prefix("Bearer ").map(str::trim).unwrap_or(raw)
}
