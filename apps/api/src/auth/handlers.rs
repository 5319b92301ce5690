//! Axum route handlers for login, access requests, and the admin dashboard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::models::{AccessRequest, GeneratedCredentials, Role, UserProfile};
use crate::auth::session::{AdminSession, AuthSession};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: Uuid,
    pub user: UserProfile,
    /// Present for admins only: the dashboard opens on the pending list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_requests: Option<Vec<AccessRequest>>,
}

#[derive(Debug, Deserialize)]
pub struct RequestAccessRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RequestAccessResponse {
    pub message: String,
    pub request: AccessRequest,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct PendingListResponse {
    pub requests: Vec<AccessRequest>,
}

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub credentials: GeneratedCredentials,
    pub requests: Vec<AccessRequest>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state.access.login(&req.email, &req.password).await?;
    let token = state.sessions.open(&user).await;

    let pending_requests = match user.role {
        Role::Admin => Some(state.access.pending_requests().await?),
        Role::User => None,
    };

    info!(
        "{} logged in as {:?} ({} active sessions)",
        user.email,
        user.role,
        state.sessions.count().await
    );
    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
        pending_requests,
    }))
}

/// POST /api/v1/auth/request-access
pub async fn handle_request_access(
    State(state): State<AppState>,
    Json(req): Json<RequestAccessRequest>,
) -> Result<(StatusCode, Json<RequestAccessResponse>), AppError> {
    let request = state.access.request_access(&req.email, &req.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestAccessResponse {
            message: state.access.confirmation_message(),
            request,
        }),
    ))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> StatusCode {
    state.sessions.close(session.token).await;
    info!("{} logged out", session.user.email);
    StatusCode::NO_CONTENT
}

/// GET /api/v1/auth/me
pub async fn handle_me(session: AuthSession) -> Json<MeResponse> {
    Json(MeResponse { user: session.user })
}

/// GET /api/v1/admin/requests
pub async fn handle_list_pending(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<PendingListResponse>, AppError> {
    let requests = state.access.pending_requests().await?;
    Ok(Json(PendingListResponse { requests }))
}

/// POST /api/v1/admin/requests/:id/approve
///
/// The generated password is returned here exactly once; nothing is emailed.
pub async fn handle_approve(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(id): Path<String>,
) -> Result<Json<ApproveResponse>, AppError> {
    let credentials = state.access.approve(&id).await?;
    info!("{} approved access for {}", admin.user.email, credentials.email);
    let requests = state.access.pending_requests().await?;
    Ok(Json(ApproveResponse {
        credentials,
        requests,
    }))
}

/// POST /api/v1/admin/requests/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(id): Path<String>,
) -> Result<Json<PendingListResponse>, AppError> {
    let rejected = state.access.reject(&id).await?;
    info!("{} rejected access for {}", admin.user.email, rejected.email);
    let requests = state.access.pending_requests().await?;
    Ok(Json(PendingListResponse { requests }))
}
