// handlers/admin/subjects.rs - Subject writes; reads are public

use axum::extract::{Path, State};

use crate::api::subjects::{SubjectRequest, SubjectResponse, UpdateSubjectRequest};
use crate::handlers::{path_id, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/admin/subjects
pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SubjectRequest>,
) -> ApiResult<SubjectResponse> {
    Ok(ApiResponse::success(state.subjects().create(request).await?))
}

/// PUT /api/admin/subjects/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateSubjectRequest>,
) -> ApiResult<SubjectResponse> {
    let id = path_id(&id, "Subject")?;
    Ok(ApiResponse::success(state.subjects().update(id, request).await?))
}

/// DELETE /api/admin/subjects/:id - courses and their grants go with it
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SubjectResponse> {
    let id = path_id(&id, "Subject")?;
    Ok(ApiResponse::success(state.subjects().delete(id).await?))
}
