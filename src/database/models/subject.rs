use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{FilterValue, Filterable};

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub subject_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub const TABLE: &'static str = "subjects";
}

impl Filterable for Subject {
    fn field(&self, column: &str) -> Option<FilterValue> {
        Some(match column {
            "id" => self.id.into(),
            "subject_name" => self.subject_name.as_str().into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}
