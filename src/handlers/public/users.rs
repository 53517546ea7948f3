// handlers/public/users.rs - Registration, login and public profile lookup

use axum::extract::{Path, State};

use crate::api::users::{LoginUserRequest, RegisterUserRequest, TokenResponse, UserResponse};
use crate::handlers::{path_id, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterUserRequest>,
) -> ApiResult<UserResponse> {
    let user = state.users().register(request).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/users/login - exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginUserRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.users().login(request).await?;
    Ok(ApiResponse::success(token))
}

/// GET /api/users/user/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserResponse> {
    let id = path_id(&id, "User")?;
    Ok(ApiResponse::success(state.users().get(id).await?))
}
