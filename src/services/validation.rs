use std::collections::HashMap;

use super::error::ServiceError;
use crate::api::paging::MAX_SIZE;

/// Collects field errors; `finish` turns any into a `ServiceError::Validation`
#[derive(Debug, Default)]
pub struct Validator {
    field_errors: HashMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, field: &str, message: String) {
        self.field_errors.entry(field.to_string()).or_insert(message);
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.fail(field, "This field is required".to_string());
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.fail(field, format!("Must be at most {} characters", max));
        }
        self
    }

    pub fn min(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        if value < min {
            self.fail(field, format!("Must be at least {}", min));
        }
        self
    }

    pub fn range(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.fail(field, format!("Must be between {} and {}", min, max));
        }
        self
    }

    /// Value must parse as a UUID; empty values are left to `required`
    pub fn uuid(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && uuid::Uuid::parse_str(value).is_err() {
            self.fail(field, "Must be a valid identifier".to_string());
        }
        self
    }

    /// `page >= 1`, `1 <= size <= 100`
    pub fn paging(&mut self, page: i64, size: i64) -> &mut Self {
        self.min("page", page, 1).range("size", size, 1, MAX_SIZE)
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.fail(field, message.into());
        self
    }

    pub fn finish(&mut self) -> Result<(), ServiceError> {
        if self.field_errors.is_empty() {
            return Ok(());
        }
        Err(ServiceError::Validation {
            message: "Invalid request".to_string(),
            field_errors: Some(std::mem::take(&mut self.field_errors)),
        })
    }
}

/// Request bodies that can check themselves before a usecase runs
pub trait Validate {
    fn validate(&self) -> Result<(), ServiceError>;
}
