// handlers/protected/courses.rs - Courses the caller has been granted

use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::paging::{default_page, default_size};
use crate::api::user_courses::{SearchUserCourseRequest, UserCourseListResponse, UserCourseResponse};
use crate::auth::AuthUser;
use crate::handlers::{path_id, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Query accepted by the caller's course listing; the owner always comes from the token
#[derive(Debug, Deserialize)]
pub struct AccessibleCoursesQuery {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

/// GET /api/courses?course_id=&subject_id=&page=&size=
pub async fn list(
    State(state): State<AppState>,
    auth_user: AuthUser,
    QueryParams(query): QueryParams<AccessibleCoursesQuery>,
) -> ApiResult<Vec<UserCourseListResponse>> {
    let request = SearchUserCourseRequest {
        user_id: auth_user.id.to_string(),
        course_id: query.course_id,
        subject_id: query.subject_id,
        page: query.page,
        size: query.size,
    };
    let page = state.user_courses().search(request, Some(auth_user.id)).await?;
    Ok(ApiResponse::paged(page))
}

/// GET /api/courses/:id - opens a granted course and stamps the access time
pub async fn get(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<UserCourseResponse> {
    let course_id = path_id(&id, "Course")?;
    let grant = state.user_courses().get(auth_user.id, course_id).await?;
    Ok(ApiResponse::success(grant))
}
