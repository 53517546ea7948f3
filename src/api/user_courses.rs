use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::courses::{CourseListResponse, CourseResponse};
use super::paging::{default_page, default_size};
use super::users::UserResponse;
use crate::database::models::UserCourse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCourseResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseResponse>,
    pub accessed_at: Option<DateTime<Utc>>,
}

impl From<&UserCourse> for UserCourseResponse {
    fn from(grant: &UserCourse) -> Self {
        Self {
            id: grant.id,
            user: grant.user.as_ref().map(UserResponse::from),
            course: grant.course.as_ref().map(CourseResponse::from),
            accessed_at: grant.accessed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCourseListResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseListResponse>,
    pub accessed_at: Option<DateTime<Utc>>,
}

impl From<&UserCourse> for UserCourseListResponse {
    fn from(grant: &UserCourse) -> Self {
        Self {
            id: grant.id,
            user: grant.user.as_ref().map(UserResponse::from),
            course: grant.course.as_ref().map(CourseListResponse::from),
            accessed_at: grant.accessed_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserCourseRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub course_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUserCourseRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for SearchUserCourseRequest {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            course_id: String::new(),
            subject_id: String::new(),
            page: default_page(),
            size: default_size(),
        }
    }
}
