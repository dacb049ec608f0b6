use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Failures raised while resolving, dispatching, or writing a view.
///
/// None of these are retried. Capture happens before anything reaches the real
/// output, so a failed `view` leaves the outer response untouched.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("request attribute `{name}` is not set")]
    NoSuchAttribute { name: String },
    #[error("request attribute `{name}` does not hold a `{expected}`")]
    AttributeType {
        name: String,
        expected: &'static str,
    },
    #[error("cannot render a view without a model")]
    NullModel,
    #[error("no `{view_name}` view template found for model type `{model_type}`")]
    NoViewTemplate {
        model_type: &'static str,
        view_name: String,
    },
    #[error("no dispatcher available for `{path}`")]
    DispatchUnavailable { path: String },
    #[error("character output and byte output cannot both be used on one response")]
    WriterStreamConflict,
    #[error("failed to write rendered output")]
    Write(#[from] std::fmt::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl RenderError {
    pub fn no_such_attribute(name: impl Into<String>) -> Self {
        Self::NoSuchAttribute { name: name.into() }
    }

    pub fn attribute_type<T>(name: impl Into<String>) -> Self {
        Self::AttributeType {
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    pub fn no_view_template(model_type: &'static str, view_name: impl Into<String>) -> Self {
        Self::NoViewTemplate {
            model_type,
            view_name: view_name.into(),
        }
    }

    pub fn dispatch_unavailable(path: impl Into<String>) -> Self {
        Self::DispatchUnavailable { path: path.into() }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            RenderError::DispatchUnavailable { .. } => StatusCode::NOT_FOUND,
            RenderError::NoSuchAttribute { .. }
            | RenderError::AttributeType { .. }
            | RenderError::NullModel
            | RenderError::NoViewTemplate { .. }
            | RenderError::WriterStreamConflict
            | RenderError::Write(_)
            | RenderError::Io(_)
            | RenderError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            RenderError::DispatchUnavailable { .. } => "Page not found",
            RenderError::NoViewTemplate { .. } | RenderError::NullModel => {
                "No view available for this resource"
            }
            RenderError::Template(_) => "Template rendering failed",
            RenderError::NoSuchAttribute { .. }
            | RenderError::AttributeType { .. }
            | RenderError::WriterStreamConflict
            | RenderError::Write(_)
            | RenderError::Io(_) => "Unexpected error occurred",
        }
    }
}

impl From<RenderError> for HttpError {
    fn from(error: RenderError) -> Self {
        HttpError::from_error(
            "application::error::RenderError",
            error.status_code(),
            error.presentation_message(),
            &error,
        )
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        HttpError::from(self).into_response()
    }
}

/// Top-level failure for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
