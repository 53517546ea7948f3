// handlers/admin/users.rs - User management

use axum::extract::{Path, State};

use crate::api::users::{SearchUserRequest, UpdateUserRequest, UserResponse};
use crate::handlers::{path_id, JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/admin/users?username=&email=&phone_number=&grade_level=&birth_date=&page=&size=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(request): QueryParams<SearchUserRequest>,
) -> ApiResult<Vec<UserResponse>> {
    Ok(ApiResponse::paged(state.users().search(request).await?))
}

/// PUT /api/admin/users/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    let id = path_id(&id, "User")?;
    Ok(ApiResponse::success(state.users().update(id, request).await?))
}

/// DELETE /api/admin/users/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<bool> {
    let id = path_id(&id, "User")?;
    Ok(ApiResponse::success(state.users().delete(id).await?))
}
