use serde::Serialize;
use validator::{Validate, ValidationErrors};

use crate::errors::ClientError;

/// Query parameters of `GET /photos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
    pub sort_by: String,
}

impl Default for PhotoQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: String::new(),
            sort_by: default_sort(),
        }
    }
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    20
}
fn default_sort() -> String {
    "createdAt".to_owned()
}

#[derive(Debug, Clone, Validate, Serialize)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl LoginForm {
    pub fn check(&self) -> Result<(), ClientError> {
        if self.email.is_empty() {
            return Err(ClientError::Validation("Email is required".into()));
        }
        self.validate().map_err(validation_error)
    }
}

#[derive(Debug, Clone, Validate, Serialize)]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
    pub role: String,
}

impl RegisterForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
            role: "creator".to_owned(),
        }
    }

    pub fn check(&self) -> Result<(), ClientError> {
        if self.email.is_empty() {
            return Err(ClientError::Validation("Email is required".into()));
        }
        self.validate().map_err(validation_error)?;
        if self.password != self.confirm_password {
            return Err(ClientError::Validation("Passwords must match".into()));
        }
        Ok(())
    }
}

/// Body of `POST /photos/{id}/comment`.
#[derive(Debug, Clone, Validate, Serialize)]
pub struct CommentRequest {
    #[validate(length(min = 1, message = "Comment cannot be empty"))]
    pub text: String,
}

impl CommentRequest {
    /// Trims the input; whitespace-only text fails validation.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.trim().to_owned(),
        }
    }
}

/// First field message of a failed validation, which is what a form shows
/// next to the offending input.
pub(crate) fn first_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

pub(crate) fn validation_error(errors: ValidationErrors) -> ClientError {
    ClientError::Validation(first_message(&errors))
}
