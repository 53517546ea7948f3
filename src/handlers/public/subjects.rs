// handlers/public/subjects.rs - Subject catalogue

use axum::extract::{Path, State};

use crate::api::subjects::{SearchSubjectRequest, SubjectResponse};
use crate::handlers::{path_id, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/subjects?subject_name=&page=&size=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(request): QueryParams<SearchSubjectRequest>,
) -> ApiResult<Vec<SubjectResponse>> {
    let page = state.subjects().search(request).await?;
    Ok(ApiResponse::paged(page))
}

/// GET /api/subjects/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SubjectResponse> {
    let id = path_id(&id, "Subject")?;
    Ok(ApiResponse::success(state.subjects().get(id).await?))
}
