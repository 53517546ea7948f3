use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::course::Course;
use super::user::User;
use crate::filter::{FilterValue, Filterable};

/// A grant: `user_id` may open `course_id`
#[derive(Debug, Clone, FromRow)]
pub struct UserCourse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub accessed_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub user: Option<User>,
    /// Eager-loaded course, itself carrying its subject
    #[sqlx(skip)]
    pub course: Option<Course>,
}

impl UserCourse {
    pub const TABLE: &'static str = "users_courses";

    pub fn new(user_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            accessed_at: None,
            user: None,
            course: None,
        }
    }
}

impl Filterable for UserCourse {
    fn field(&self, column: &str) -> Option<FilterValue> {
        Some(match column {
            "id" => self.id.into(),
            "user_id" => self.user_id.into(),
            "course_id" => self.course_id.into(),
            "accessed_at" => self.accessed_at.into(),
            other => {
                let (table, name) = other.split_once('.')?;
                match table {
                    "courses" => self.course.as_ref()?.field(name)?,
                    "users" => self.user.as_ref()?.field(name)?,
                    _ => return None,
                }
            }
        })
    }
}
