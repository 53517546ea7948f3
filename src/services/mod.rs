//! Usecases: validation, transactional orchestration and response shaping

pub mod course_service;
pub mod error;
pub mod subject_service;
pub mod user_course_service;
pub mod user_service;
pub mod validation;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use course_service::CourseService;
pub use error::ServiceError;
pub use subject_service::SubjectService;
pub use user_course_service::UserCourseService;
pub use user_service::UserService;

use crate::api::PageMetadata;
use crate::clock::Clock;
use crate::filter::Page;

/// One page of converted results
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub paging: PageMetadata,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: i64, size: i64, total: i64) -> Self {
        Self {
            items,
            paging: PageMetadata::new(Page::new(page, size), total),
        }
    }
}

/// Current instant from the injected clock, stored as UTC
pub(crate) fn now_utc(clock: &dyn Clock) -> DateTime<Utc> {
    clock.now().with_timezone(&Utc)
}

/// Request-supplied identifier; anything unparsable refers to nothing
pub(crate) fn parse_ref(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!("Malformed {} id '{}'", what, raw);
        ServiceError::not_found(what)
    })
}
