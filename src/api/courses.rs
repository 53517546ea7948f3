use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::paging::{default_page, default_size};
use super::subjects::SubjectResponse;
use crate::database::models::{ContentBlock, Course};

/// Full course including its content blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub course_name: String,
    pub content: Vec<ContentBlock>,
    pub grade_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectResponse>,
}

impl From<&Course> for CourseResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            course_name: course.course_name.clone(),
            content: course.content.0.clone(),
            grade_level: course.grade_level,
            created_at: course.created_at,
            updated_at: course.updated_at,
            subject: course.subject.as_ref().map(SubjectResponse::from),
        }
    }
}

/// Course as listed in search results, without the body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseListResponse {
    pub id: Uuid,
    pub course_name: String,
    pub grade_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectResponse>,
}

impl From<&Course> for CourseListResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id,
            course_name: course.course_name.clone(),
            grade_level: course.grade_level,
            created_at: course.created_at,
            updated_at: course.updated_at,
            subject: course.subject.as_ref().map(SubjectResponse::from),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseRequest {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub grade_level: i32,
    #[serde(default)]
    pub subject_id: String,
}

/// Sparse patch; `content` replaces the whole body when present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCourseRequest {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub content: Option<Vec<ContentBlock>>,
    #[serde(default)]
    pub grade_level: i32,
    #[serde(default)]
    pub subject_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCourseRequest {
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub grade_level: i32,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for SearchCourseRequest {
    fn default() -> Self {
        Self {
            course_name: String::new(),
            subject_id: String::new(),
            grade_level: 0,
            page: default_page(),
            size: default_size(),
        }
    }
}
