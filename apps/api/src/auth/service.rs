//! Access Control: login, self-service access requests, and admin approval.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crate::auth::models::{
    same_email, AccessRequest, GeneratedCredentials, RequestStatus, Role, User,
};
use crate::auth::store::{CredentialStore, RequestRepository, UserRepository};
use crate::config::AdminSeed;
use crate::errors::{AppError, AuthError};

pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$";
pub const PASSWORD_LENGTH: usize = 10;

const REQUEST_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const REQUEST_ID_LENGTH: usize = 9;

/// Draws a password of `PASSWORD_LENGTH` characters from `PASSWORD_ALPHABET`.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_token(rng, PASSWORD_ALPHABET, PASSWORD_LENGTH)
}

/// Client-style random id. Collisions are possible and tolerated.
fn generate_request_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_token(rng, REQUEST_ID_ALPHABET, REQUEST_ID_LENGTH)
}

fn random_token<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

fn today() -> String {
    chrono::Local::now().format("%-d/%-m/%Y").to_string()
}

#[derive(Clone)]
pub struct AccessControl {
    store: Arc<CredentialStore>,
    /// Address named in the request-access confirmation.
    admin_contact: Option<String>,
}

impl AccessControl {
    pub fn new(store: Arc<CredentialStore>, admin_contact: Option<String>) -> Self {
        Self {
            store,
            admin_contact,
        }
    }

    /// Inserts the admin account unless a user with that email already exists.
    /// Returns whether a record was written.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> Result<bool, AppError> {
        let _guard = self.store.exclusive().await;
        if self.store.find_by_email(&seed.email).await?.is_some() {
            return Ok(false);
        }
        self.store
            .insert_user(User {
                email: seed.email.trim().to_string(),
                password: seed.password.clone(),
                role: Role::Admin,
                name: seed.name.clone(),
            })
            .await?;
        info!("Seeded admin account {}", seed.email);
        Ok(true)
    }

    /// Exact password match plus case-insensitive email match, nothing else.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let users = self.store.list_users().await?;
        users
            .into_iter()
            .find(|u| same_email(&u.email, email) && u.password == password)
            .ok_or_else(|| {
                warn!("Failed login for {}", email.trim());
                AppError::Auth(AuthError::InvalidCredentials)
            })
    }

    pub async fn request_access(&self, email: &str, name: &str) -> Result<AccessRequest, AppError> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() || name.is_empty() {
            return Err(AppError::Validation(
                "El nombre y el correo son obligatorios.".to_string(),
            ));
        }

        let _guard = self.store.exclusive().await;

        if self.store.find_by_email(email).await?.is_some() {
            return Err(AuthError::AccountAlreadyActive.into());
        }
        let requests = self.store.list_requests().await?;
        if requests
            .iter()
            .any(|r| r.is_pending() && same_email(&r.email, email))
        {
            return Err(AuthError::PendingRequestExists.into());
        }

        let request = AccessRequest {
            id: generate_request_id(&mut rand::thread_rng()),
            email: email.to_string(),
            name: name.to_string(),
            date: today(),
            status: RequestStatus::Pending,
        };
        self.store.insert_request(request.clone()).await?;
        info!("Access request {} recorded for {}", request.id, request.email);
        Ok(request)
    }

    pub fn confirmation_message(&self) -> String {
        let contact = self
            .admin_contact
            .as_deref()
            .unwrap_or("el administrador");
        format!(
            "Solicitud enviada a {contact}. Recibirás tus credenciales por correo cuando seas aprobado."
        )
    }

    /// Pending requests in stored order.
    pub async fn pending_requests(&self) -> Result<Vec<AccessRequest>, AppError> {
        Ok(self
            .store
            .list_requests()
            .await?
            .into_iter()
            .filter(AccessRequest::is_pending)
            .collect())
    }

    /// Creates a `user` account for the request's email with a fresh password
    /// and marks exactly that request approved.
    pub async fn approve(&self, request_id: &str) -> Result<GeneratedCredentials, AppError> {
        let _guard = self.store.exclusive().await;

        let request = self.pending_request(request_id).await?;
        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::AccountAlreadyActive.into());
        }

        // Status first: a failed user write must leave the request retryable.
        self.store
            .update_status(&request.id, RequestStatus::Approved)
            .await?;

        let password = generate_password(&mut rand::thread_rng());
        let inserted = self
            .store
            .insert_user(User {
                email: request.email.clone(),
                password: password.clone(),
                role: Role::User,
                name: request.name.clone(),
            })
            .await;
        if let Err(e) = inserted {
            warn!("Creating user for request {} failed, reverting to pending", request.id);
            if let Err(revert) = self
                .store
                .update_status(&request.id, RequestStatus::Pending)
                .await
            {
                warn!("Could not revert request {}: {revert}", request.id);
            }
            return Err(e.into());
        }

        info!("Approved access request {} for {}", request.id, request.email);
        Ok(GeneratedCredentials {
            email: request.email,
            password,
        })
    }

    pub async fn reject(&self, request_id: &str) -> Result<AccessRequest, AppError> {
        let _guard = self.store.exclusive().await;

        self.pending_request(request_id).await?;
        let updated = self
            .store
            .update_status(request_id, RequestStatus::Rejected)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {request_id} not found")))?;

        info!("Rejected access request {}", updated.id);
        Ok(updated)
    }

    async fn pending_request(&self, request_id: &str) -> Result<AccessRequest, AppError> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request {request_id} not found")))?;
        if !request.is_pending() {
            return Err(AppError::Conflict(format!(
                "Request {request_id} is no longer pending"
            )));
        }
        Ok(request)
    }
}
