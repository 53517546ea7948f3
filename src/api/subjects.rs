use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::paging::{default_page, default_size};
use crate::database::models::Subject;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectResponse {
    pub id: Uuid,
    pub subject_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Subject> for SubjectResponse {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            subject_name: subject.subject_name.clone(),
            created_at: subject.created_at,
            updated_at: subject.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRequest {
    #[serde(default)]
    pub subject_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubjectRequest {
    #[serde(default)]
    pub subject_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSubjectRequest {
    #[serde(default)]
    pub subject_name: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for SearchSubjectRequest {
    fn default() -> Self {
        Self {
            subject_name: String::new(),
            page: default_page(),
            size: default_size(),
        }
    }
}
