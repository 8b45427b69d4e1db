use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use user_registry::RegistryError;

/// Ошибки HTTP слоя. Тело ответа: короткая plain-text строка с `\n` в конце.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad json")]
    BadJson(#[source] serde_json::Error),

    #[error("validation error")]
    Validation(&'static str),

    #[error("not found")]
    NotFound(#[from] RegistryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadJson(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadJson(e) => tracing::debug!(error = %e, "rejected body"),
            ApiError::Validation(field) => tracing::debug!(field, "rejected user"),
            ApiError::NotFound(e) => tracing::debug!(error = %e, "lookup miss"),
        }
        (self.status(), format!("{self}\n")).into_response()
    }
}

/// Ошибка запуска / работы HTTP сервера.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("bind api {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("axum serve: {0}")]
    Serve(#[source] std::io::Error),
}
