// handlers/protected/users.rs - The caller's own account

use axum::extract::State;

use crate::api::users::{UpdateUserRequest, UserResponse};
use crate::auth::AuthUser;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/users/current
pub async fn current(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<UserResponse> {
    Ok(ApiResponse::success(state.users().current(&auth_user).await?))
}

/// POST /api/users/logout - revokes the stored token
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<bool> {
    Ok(ApiResponse::success(state.users().logout(&auth_user).await?))
}

/// PUT /api/users - sparse update of the caller's profile
pub async fn update(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state.users().update(auth_user.id, request).await?;
    Ok(ApiResponse::success(user))
}
