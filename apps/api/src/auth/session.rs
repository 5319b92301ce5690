//! Authenticated states of the access-control flow, held server-side.
//!
//! A session exists only between `login` and `logout`. Admin sessions carry no
//! workspace; user sessions own the whole CV workspace, which logout drops.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::models::{Role, User, UserProfile};
use crate::errors::AppError;
use crate::optimizer::workspace::Workspace;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub enum SessionKind {
    Admin,
    User(Box<Workspace>),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserProfile,
    pub kind: SessionKind,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    /// Opens a session whose kind follows the user's role.
    pub async fn open(&self, user: &User) -> Uuid {
        let token = Uuid::new_v4();
        let kind = match user.role {
            Role::Admin => SessionKind::Admin,
            Role::User => SessionKind::User(Box::default()),
        };
        self.sessions.write().await.insert(
            token,
            Session {
                user: user.profile(),
                kind,
            },
        );
        token
    }

    pub async fn profile(&self, token: Uuid) -> Option<UserProfile> {
        self.sessions
            .read()
            .await
            .get(&token)
            .map(|s| s.user.clone())
    }

    /// Ends the session and everything it held. Returns whether it existed.
    pub async fn close(&self, token: Uuid) -> bool {
        self.sessions.write().await.remove(&token).is_some()
    }

    /// Runs `f` against a user session's workspace under the registry lock.
    /// Never hold this across an await on the gateway.
    pub async fn with_workspace<R>(
        &self,
        token: Uuid,
        f: impl FnOnce(&mut Workspace) -> R,
    ) -> Result<R, AppError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&token).map(|s| &mut s.kind) {
            Some(SessionKind::User(workspace)) => Ok(f(workspace.as_mut())),
            Some(SessionKind::Admin) => Err(AppError::Forbidden),
            None => Err(AppError::Unauthorized),
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    Uuid::parse_str(token).ok()
}

/// Any authenticated session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: Uuid,
    pub user: UserProfile,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let user = state
            .sessions
            .profile(token)
            .await
            .ok_or(AppError::Unauthorized)?;
        Ok(AuthSession { token, user })
    }
}

/// An Authenticated-Admin session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if session.user.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminSession(session))
    }
}

/// An Authenticated-User session (the main application).
#[derive(Debug, Clone)]
pub struct UserSession(pub AuthSession);

#[async_trait]
impl FromRequestParts<AppState> for UserSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        if session.user.role != Role::User {
            return Err(AppError::Forbidden);
        }
        Ok(UserSession(session))
    }
}
