use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name, email and password are required")]
    MissingFields,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("please enter a valid email address")]
    InvalidEmail,
    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{0}")]
    InvalidCategory(String),
}

impl ValidationError {
    fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingFields | ValidationError::MissingCredentials => {
                "missing_fields"
            }
            ValidationError::InvalidEmail => "invalid_email",
            ValidationError::PasswordTooShort { .. } => "password_too_short",
            ValidationError::EmptyField(_) => "empty_field",
            ValidationError::InvalidCategory(_) => "invalid_category",
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid admin key")]
    InvalidAdminKey,
    #[error("unauthorized")]
    Unauthorized,
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("storage schema missing: {0}")]
    SchemaMissing(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(v) => v.code(),
            DomainError::DuplicateEmail(_) => "duplicate_email",
            DomainError::InvalidCredentials => "invalid_credentials",
            DomainError::InvalidAdminKey => "invalid_admin_key",
            DomainError::Unauthorized => "unauthorized",
            DomainError::UserNotFound(_) => "not_found",
            DomainError::BackendUnavailable(_) => "backend_unavailable",
            DomainError::SchemaMissing(_) => "schema_missing",
            DomainError::Internal(_) => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::Validation(_) | DomainError::InvalidAdminKey => StatusCode::BAD_REQUEST,
            DomainError::DuplicateEmail(_) => StatusCode::CONFLICT,
            DomainError::InvalidCredentials | DomainError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            DomainError::UserNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::BackendUnavailable(_) | DomainError::SchemaMissing(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the logs
        let message = match self {
            DomainError::BackendUnavailable(_) | DomainError::SchemaMissing(_) => {
                "storage is temporarily unavailable, please try again later".to_string()
            }
            DomainError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: &message,
            code: self.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_status_codes() {
        assert_eq!(
            DomainError::from(ValidationError::MissingFields).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DomainError::DuplicateEmail("a@b.c".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DomainError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DomainError::SchemaMissing("users".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn login_message_does_not_ask_for_a_name() {
        let err = DomainError::from(ValidationError::MissingCredentials);
        assert_eq!(err.code(), "missing_fields");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.to_string().contains("name"));
    }

    #[test]
    fn password_rule_mentions_minimum() {
        let err = DomainError::from(ValidationError::PasswordTooShort { min: 6 });
        assert_eq!(err.code(), "password_too_short");
        assert!(err.to_string().contains('6'));
    }
}
