use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::groups::GroupError, application::repos::RepoError, domain::error::DomainError,
    infra::error::InfraError,
};

/// Failure details carried on a response extension until `log_responses` picks them up.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    /// Capture `error` and every `source()` beneath it, outermost first.
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut cause = error.source();
        while let Some(inner) = cause {
            messages.push(inner.to_string());
            cause = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// A plain-text error response whose diagnostics stay server-side.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            report: ErrorReport::from_error(source, status, error),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Repository failures that escape the services become 4xx/5xx responses here.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    let (status, public_message) = match &err {
        RepoError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
        RepoError::Duplicate { .. } | RepoError::Integrity { .. } => {
            (StatusCode::CONFLICT, "Conflicting change")
        }
        RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid input"),
        RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Database busy, try again"),
        RepoError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure"),
    };
    HttpError::from_error(source, status, public_message, &err)
}

/// Top-level failure of a command or of a request outside the feed/post flows.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Domain(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "Request could not be processed")
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, "Resource already exists"),
            AppError::Repo(RepoError::Timeout) | AppError::Infra(InfraError::Database(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
            }
            AppError::Repo(RepoError::NotFound) => (StatusCode::NOT_FOUND, "Resource not found"),
            AppError::Infra(InfraError::Configuration(_) | InfraError::Migration(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Service misconfigured")
            }
            AppError::Infra(_) | AppError::Repo(_) | AppError::Unexpected(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error occurred")
            }
        }
    }
}

impl From<GroupError> for AppError {
    fn from(error: GroupError) -> Self {
        match error {
            GroupError::Validation(err) => AppError::Domain(err),
            GroupError::Conflict { slug } => {
                AppError::Conflict(format!("group slug `{slug}` is already taken"))
            }
            GroupError::Repo(err) => AppError::Repo(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, message).into_response();
        report.attach(&mut response);
        response
    }
}
