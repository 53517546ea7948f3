use axum::body::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::validation::{Validate, Validator};
use super::{now_utc, Paged, ServiceError};
use crate::api::courses::{
    CourseListResponse, CourseRequest, CourseResponse, SearchCourseRequest, UpdateCourseRequest,
};
use crate::clock::Clock;
use crate::database::models::{ContentBlock, Course};
use crate::database::{transaction, Store};
use crate::filter::search;
use crate::storage::FileRepository;

fn check_blocks(validator: &mut Validator, blocks: &[ContentBlock]) {
    for (i, block) in blocks.iter().enumerate() {
        if block.data.trim().is_empty() {
            validator.reject(&format!("content[{}].data", i), "This field is required");
        }
    }
}

impl Validate for CourseRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        let mut validator = Validator::new();
        validator
            .required("course_name", &self.course_name)
            .max_len("course_name", &self.course_name, 255)
            .min("grade_level", self.grade_level as i64, 0)
            .required("subject_id", &self.subject_id)
            .uuid("subject_id", &self.subject_id);
        check_blocks(&mut validator, &self.content);
        validator.finish()
    }
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        let mut validator = Validator::new();
        validator
            .max_len("course_name", &self.course_name, 255)
            .min("grade_level", self.grade_level as i64, 0)
            .uuid("subject_id", &self.subject_id);
        if let Some(blocks) = &self.content {
            check_blocks(&mut validator, blocks);
        }
        validator.finish()
    }
}

/// Final path component of a client-supplied file name, whichever separator it uses
fn base_name(file_name: &str) -> &str {
    file_name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file_name).trim()
}

#[derive(Clone)]
pub struct CourseService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    files: Arc<dyn FileRepository>,
}

impl CourseService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, files: Arc<dyn FileRepository>) -> Self {
        Self { store, clock, files }
    }

    pub async fn create(&self, request: CourseRequest) -> Result<CourseResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;

                let subject_id = Uuid::parse_str(&request.subject_id).map_err(|_| ServiceError::validation("Invalid subject_id"))?;
                let subject = tx.subjects().find_by_id(subject_id).await?.ok_or_else(|| {
                    warn!("Subject {} not found for new course", subject_id);
                    ServiceError::not_found("Subject")
                })?;

                let now = now_utc(clock.as_ref());
                let mut course = Course {
                    id: Uuid::new_v4(),
                    course_name: request.course_name,
                    content: sqlx::types::Json(request.content),
                    grade_level: request.grade_level,
                    subject_id,
                    created_at: now,
                    updated_at: now,
                    subject: None,
                };
                tx.courses().create(&course).await?;
                course.subject = Some(subject);
                Ok(CourseResponse::from(&course))
            })
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<CourseResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let course = tx.courses().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Course {} not found", id);
                    ServiceError::not_found("Course")
                })?;
                Ok(CourseResponse::from(&course))
            })
        })
        .await
    }

    pub async fn search(&self, request: SearchCourseRequest) -> Result<Paged<CourseListResponse>, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Validator::new().paging(request.page, request.size).finish()?;
                let filter = search::courses(&request)?;
                let (courses, total) = tx.courses().search(&filter).await?;
                let items = courses.iter().map(CourseListResponse::from).collect();
                Ok(Paged::new(items, request.page, request.size, total))
            })
        })
        .await
    }

    /// Sparse patch; a new subject must exist
    pub async fn update(&self, id: Uuid, request: UpdateCourseRequest) -> Result<CourseResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;

                let mut course = tx.courses().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Course {} not found for update", id);
                    ServiceError::not_found("Course")
                })?;

                if !request.course_name.is_empty() {
                    course.course_name = request.course_name;
                }
                if let Some(blocks) = request.content {
                    course.content = sqlx::types::Json(blocks);
                }
                if request.grade_level != 0 {
                    course.grade_level = request.grade_level;
                }
                if !request.subject_id.is_empty() {
                    let subject_id =
                        Uuid::parse_str(&request.subject_id).map_err(|_| ServiceError::validation("Invalid subject_id"))?;
                    let subject = tx.subjects().find_by_id(subject_id).await?.ok_or_else(|| {
                        warn!("Subject {} not found for course {}", subject_id, id);
                        ServiceError::not_found("Subject")
                    })?;
                    course.subject_id = subject_id;
                    course.subject = Some(subject);
                }
                course.updated_at = now_utc(clock.as_ref());

                tx.courses().update(&course).await?;
                Ok(CourseResponse::from(&course))
            })
        })
        .await
    }

    /// Delete the course; its grants cascade. Uploaded images stay in storage,
    /// since several courses may reference the same URL.
    pub async fn delete(&self, id: Uuid) -> Result<CourseResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let course = tx.courses().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Course {} not found for delete", id);
                    ServiceError::not_found("Course")
                })?;
                tx.courses().delete(id).await?;
                Ok(CourseResponse::from(&course))
            })
        })
        .await
    }

    /// Store an attachment under `courses/<YYYYMMDD_HHMMSS>_<name>` and return its URL
    pub async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, ServiceError> {
        let name = base_name(file_name);
        if name.is_empty() || name == "." || name == ".." {
            return Err(ServiceError::Validation {
                message: "Invalid request".to_string(),
                field_errors: Some([("file".to_string(), "A file name is required".to_string())].into()),
            });
        }

        let stamp = self.clock.now().format("%Y%m%d_%H%M%S");
        let path = format!("courses/{}_{}", stamp, name);
        let url = self.files.upload_file(data, &path, content_type).await?;
        debug!("Uploaded course file to {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::database::memory::MemoryStore;
    use crate::database::models::BlockType;
    use crate::services::SubjectService;
    use crate::api::subjects::SubjectRequest;
    use crate::storage::LocalFileRepository;
    use chrono::{TimeZone, Utc};

    struct Fixture {
        store: MemoryStore,
        subjects: SubjectService,
        courses: CourseService,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        // 2024-03-05 03:04:05 UTC is 10:04:05 in Jakarta
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 3, 4, 5).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(start, chrono_tz::Asia::Jakarta));
        let dir = tempfile::tempdir().unwrap();
        let files = Arc::new(LocalFileRepository::new(dir.path(), "/images"));
        Fixture {
            store,
            subjects: SubjectService::new(shared.clone(), clock.clone()),
            courses: CourseService::new(shared, clock, files),
            dir,
        }
    }

    fn course_request(subject_id: &str) -> CourseRequest {
        CourseRequest {
            course_name: "Fractions".to_string(),
            content: vec![ContentBlock { kind: BlockType::Text, data: "Halves".to_string() }],
            grade_level: 4,
            subject_id: subject_id.to_string(),
        }
    }

    #[tokio::test]
    async fn create_with_missing_subject_inserts_nothing() {
        let f = fixture();
        let err = f.courses.create(course_request(&Uuid::new_v4().to_string())).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(f.store.counts().await.courses, 0);
    }

    #[tokio::test]
    async fn create_returns_course_with_subject() {
        let f = fixture();
        let math = f.subjects.create(SubjectRequest { subject_name: "Math".to_string() }).await.unwrap();
        let course = f.courses.create(course_request(&math.id.to_string())).await.unwrap();
        assert_eq!(course.subject.unwrap().id, math.id);

        let fetched = f.courses.get(course.id).await.unwrap();
        assert_eq!(fetched.content.len(), 1);
        assert_eq!(fetched.subject.unwrap().subject_name, "Math");
    }

    #[tokio::test]
    async fn empty_patch_keeps_course() {
        let f = fixture();
        let math = f.subjects.create(SubjectRequest { subject_name: "Math".to_string() }).await.unwrap();
        let before = f.courses.create(course_request(&math.id.to_string())).await.unwrap();
        let after = f.courses.update(before.id, UpdateCourseRequest::default()).await.unwrap();
        assert_eq!(after.course_name, before.course_name);
        assert_eq!(after.content, before.content);
        assert_eq!(after.grade_level, before.grade_level);
        assert_eq!(after.subject.unwrap().id, math.id);
    }

    #[tokio::test]
    async fn update_to_unknown_subject_is_not_found() {
        let f = fixture();
        let math = f.subjects.create(SubjectRequest { subject_name: "Math".to_string() }).await.unwrap();
        let course = f.courses.create(course_request(&math.id.to_string())).await.unwrap();
        let patch = UpdateCourseRequest {
            subject_id: Uuid::new_v4().to_string(),
            ..Default::default()
        };
        assert!(matches!(f.courses.update(course.id, patch).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn upload_uses_clock_timestamp_and_base_name() {
        let f = fixture();
        let url = f
            .courses
            .upload_file("C:\\photos\\cat.png", "image/png", Bytes::from_static(b"img"))
            .await
            .unwrap();
        assert_eq!(url, "/images/courses/20240305_100405_cat.png");
    }

    #[tokio::test]
    async fn delete_keeps_images_shared_with_other_courses() {
        let f = fixture();
        let math = f.subjects.create(SubjectRequest { subject_name: "Math".to_string() }).await.unwrap();
        let url = f
            .courses
            .upload_file("diagram.png", "image/png", Bytes::from_static(b"img"))
            .await
            .unwrap();
        let mut request = course_request(&math.id.to_string());
        request.content.push(ContentBlock { kind: BlockType::Image, data: url.clone() });
        let first = f.courses.create(request.clone()).await.unwrap();
        let second = f.courses.create(request).await.unwrap();

        let stored = f.dir.path().join(url.trim_start_matches("/images/"));
        f.courses.delete(first.id).await.unwrap();
        assert!(stored.exists());
        assert_eq!(f.store.counts().await.courses, 1);

        let remaining = f.courses.get(second.id).await.unwrap();
        assert!(remaining.content.iter().any(|block| block.kind == BlockType::Image && block.data == url));
    }

    #[test]
    fn base_name_strips_directories() {
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
        assert_eq!(base_name("dir\\c.txt"), "c.txt");
    }
}
