// handlers/admin/user_courses.rs - Course grants

use axum::extract::{Path, State};

use crate::api::user_courses::{SearchUserCourseRequest, UserCourseListResponse, UserCourseRequest, UserCourseResponse};
use crate::handlers::{path_id, JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/admin/user-courses?user_id=&course_id=&subject_id=&page=&size=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(request): QueryParams<SearchUserCourseRequest>,
) -> ApiResult<Vec<UserCourseListResponse>> {
    Ok(ApiResponse::paged(state.user_courses().search(request, None).await?))
}

/// POST /api/admin/user-courses - grants every listed course to one user, all or nothing
pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<UserCourseRequest>,
) -> ApiResult<Vec<UserCourseResponse>> {
    Ok(ApiResponse::success(state.user_courses().create(request).await?))
}

/// DELETE /api/admin/user-courses/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<UserCourseResponse> {
    let id = path_id(&id, "User course")?;
    Ok(ApiResponse::success(state.user_courses().delete(id).await?))
}
