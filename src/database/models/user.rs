use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{FilterValue, Filterable};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plain password
    pub password: String,
    pub phone_number: String,
    pub grade_level: i32,
    pub role: String,
    pub avatar_url: String,
    pub birth_date: Option<NaiveDate>,
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub const TABLE: &'static str = "users";

    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

impl Filterable for User {
    fn field(&self, column: &str) -> Option<FilterValue> {
        Some(match column {
            "id" => self.id.into(),
            "username" => self.username.as_str().into(),
            "email" => self.email.as_str().into(),
            "phone_number" => self.phone_number.as_str().into(),
            "grade_level" => self.grade_level.into(),
            "role" => self.role.as_str().into(),
            "birth_date" => self.birth_date.into(),
            "created_at" => self.created_at.into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
