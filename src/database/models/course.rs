use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::subject::Subject;
use crate::filter::{FilterValue, Filterable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Image,
}

/// One entry of a course body: a paragraph of text or an image URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub data: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub course_name: String,
    pub content: Json<Vec<ContentBlock>>,
    pub grade_level: i32,
    pub subject_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Eager-loaded parent subject
    #[sqlx(skip)]
    pub subject: Option<Subject>,
}

impl Course {
    pub const TABLE: &'static str = "courses";
}

impl Filterable for Course {
    fn field(&self, column: &str) -> Option<FilterValue> {
        Some(match column {
            "id" => self.id.into(),
            "course_name" => self.course_name.as_str().into(),
            "grade_level" => self.grade_level.into(),
            "subject_id" => self.subject_id.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}
