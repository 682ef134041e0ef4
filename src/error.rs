use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::Value;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum HrError {
    #[error("{0}")]
    PolicyViolation(String),

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("No active check-in found for today")]
    NotCheckedIn,

    #[error("No pending presence prompt")]
    NoPendingPrompt,

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Backing store unavailable")]
    NetworkFailure(#[from] anyhow::Error),
}

impl HrError {
    pub fn code(&self) -> &'static str {
        match self {
            HrError::PolicyViolation(_) => "POLICY_VIOLATION",
            HrError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            HrError::NotCheckedIn => "NOT_CHECKED_IN",
            HrError::NoPendingPrompt => "NO_PENDING_PROMPT",
            HrError::Validation(_) => "VALIDATION_FAILURE",
            HrError::InvalidTransition(_) => "INVALID_TRANSITION",
            HrError::Unauthorized(_) => "UNAUTHORIZED",
            HrError::Forbidden(_) => "FORBIDDEN",
            HrError::NetworkFailure(_) => "NETWORK_FAILURE",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        HrError::Validation(vec![message.into()])
    }
}

impl ResponseError for HrError {
    fn status_code(&self) -> StatusCode {
        match self {
            HrError::PolicyViolation(_) | HrError::Forbidden(_) => StatusCode::FORBIDDEN,
            HrError::AlreadyCheckedIn
            | HrError::NotCheckedIn
            | HrError::NoPendingPrompt
            | HrError::InvalidTransition(_) => StatusCode::CONFLICT,
            HrError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HrError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HrError::NetworkFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            HrError::Validation(errors) => Some(serde_json::json!({ "errors": errors })),
            HrError::NetworkFailure(e) => {
                tracing::error!(error = ?e, "Backing store request failed");
                None
            }
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            details,
        })
    }
}

impl From<ValidationErrors> for HrError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        flatten_validation_errors("", &errors, &mut messages);
        messages.sort();
        HrError::Validation(messages)
    }
}

fn flatten_validation_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if field.to_string() == "__all__" {
            prefix.trim_end_matches('.').to_string()
        } else {
            format!("{prefix}{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    if path.is_empty() {
                        out.push(message);
                    } else {
                        out.push(format!("{path}: {message}"));
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                flatten_validation_errors(&format!("{path}."), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{path}[{index}]."), inner, out);
                }
            }
        }
    }
}
