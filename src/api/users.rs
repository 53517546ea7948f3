use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::paging::{default_page, default_size};
use crate::database::models::User;

/// Public view of a user; the password hash and stored token never leave the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub grade_level: i32,
    pub role: String,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            grade_level: user.grade_level,
            role: user.role.clone(),
            avatar_url: user.avatar_url.clone(),
            birth_date: user.birth_date,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub grade_level: i32,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Query string of `GET /api/admin/users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub grade_level: i32,
    /// `YYYY-MM-DD`; parsed by the service so a malformed date is a validation error
    #[serde(default)]
    pub birth_date: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl Default for SearchUserRequest {
    fn default() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            phone_number: String::new(),
            grade_level: 0,
            birth_date: String::new(),
            page: default_page(),
            size: default_size(),
        }
    }
}

/// Sparse patch: empty strings, zero and absent dates leave the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub grade_level: i32,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub avatar_url: String,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.username.is_empty()
            && self.email.is_empty()
            && self.password.is_empty()
            && self.phone_number.is_empty()
            && self.grade_level == 0
            && self.birth_date.is_none()
            && self.avatar_url.is_empty()
    }
}
