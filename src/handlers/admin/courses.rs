// handlers/admin/courses.rs - Course management and attachment upload

use axum::extract::{multipart::MultipartRejection, Multipart, Path, State};

use crate::api::courses::{
    CourseListResponse, CourseRequest, CourseResponse, SearchCourseRequest, UpdateCourseRequest,
};
use crate::error::ApiError;
use crate::handlers::{path_id, JsonBody, QueryParams};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "file";

/// GET /api/admin/courses?course_name=&subject_id=&grade_level=&page=&size=
pub async fn list(
    State(state): State<AppState>,
    QueryParams(request): QueryParams<SearchCourseRequest>,
) -> ApiResult<Vec<CourseListResponse>> {
    Ok(ApiResponse::paged(state.courses().search(request).await?))
}

/// GET /api/admin/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<CourseResponse> {
    let id = path_id(&id, "Course")?;
    Ok(ApiResponse::success(state.courses().get(id).await?))
}

/// POST /api/admin/courses
pub async fn create(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CourseRequest>,
) -> ApiResult<CourseResponse> {
    Ok(ApiResponse::success(state.courses().create(request).await?))
}

/// PUT /api/admin/courses/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateCourseRequest>,
) -> ApiResult<CourseResponse> {
    let id = path_id(&id, "Course")?;
    Ok(ApiResponse::success(state.courses().update(id, request).await?))
}

/// DELETE /api/admin/courses/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<CourseResponse> {
    let id = path_id(&id, "Course")?;
    Ok(ApiResponse::success(state.courses().delete(id).await?))
}

/// POST /api/admin/courses/upload - multipart form with a `file` field
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;

        let url = state.courses().upload_file(&file_name, &content_type, data).await?;
        return Ok(ApiResponse::success(url));
    }

    tracing::warn!("Upload request without a '{}' field", UPLOAD_FIELD);
    Err(ApiError::bad_request(format!("Missing multipart field '{}'", UPLOAD_FIELD)))
}
