use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::store::StoreError;
use crate::llm_client::GatewayError;

/// Shown when the analyze → optimize action fails at the gateway.
pub const PROCESS_FAILED_MESSAGE: &str =
    "Error al procesar el CV. Verifica tu conexión o intenta con un texto más corto.";

/// Shown when tailoring fails at the gateway.
pub const TAILOR_FAILED_MESSAGE: &str = "Error al personalizar el CV.";

/// Failures of the access-control flow. Messages are user-facing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Credenciales inválidas. Verifica tu correo y contraseña.")]
    InvalidCredentials,

    #[error("Este correo ya tiene una cuenta activa.")]
    AccountAlreadyActive,

    #[error("Ya existe una solicitud pendiente para este correo.")]
    PendingRequestExists,
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Gateway failure plus the localized message the user sees instead of the detail.
    #[error("Gateway error: {source}")]
    Gateway {
        #[source]
        source: GatewayError,
        user_message: &'static str,
    },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn gateway(source: GatewayError, user_message: &'static str) -> Self {
        AppError::Gateway {
            source,
            user_message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Auth(e) => {
                let (status, code) = match e {
                    AuthError::InvalidCredentials => {
                        (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                    }
                    AuthError::AccountAlreadyActive => {
                        (StatusCode::CONFLICT, "ACCOUNT_ALREADY_ACTIVE")
                    }
                    AuthError::PendingRequestExists => {
                        (StatusCode::CONFLICT, "PENDING_REQUEST_EXISTS")
                    }
                };
                (status, code, e.to_string())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Gateway {
                source,
                user_message,
            } => {
                tracing::error!("Gateway error: {source}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GATEWAY_ERROR",
                    (*user_message).to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
