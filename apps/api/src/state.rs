use std::sync::Arc;

use crate::auth::service::AccessControl;
use crate::auth::session::SessionRegistry;
use crate::optimizer::gateway::CvGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub access: AccessControl,
    pub sessions: SessionRegistry,
    /// Pluggable model backend. Default: GeminiCvGateway.
    pub gateway: Arc<dyn CvGateway>,
}

#[cfg(test)]
impl AppState {
    /// In-memory credential store plus the given gateway.
    pub fn for_tests(gateway: Arc<dyn CvGateway>) -> Self {
        use crate::auth::store::CredentialStore;

        AppState {
            access: AccessControl::new(
                Arc::new(CredentialStore::in_memory()),
                Some("admin@example.com".to_string()),
            ),
            sessions: SessionRegistry::default(),
            gateway,
        }
    }
}
