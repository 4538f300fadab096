use std::sync::Arc;

use crate::domain::RolePermissions;
use crate::repos::SubjectRepo;
use crate::services::{CredentialService, IdentityResolver, RecoveryFlow, SessionRegistry};

use super::security_config::{CookiePolicy, SecurityConfig};

/// Application state shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialService,
    pub identity: IdentityResolver,
    pub sessions: SessionRegistry,
    pub recovery: RecoveryFlow,
    /// Direct access for profile and admin routes
    pub subjects: Arc<dyn SubjectRepo>,
    /// Loaded once at startup, never mutated
    pub roles: Arc<RolePermissions>,
    pub cookies: CookiePolicy,
    /// `memory` or `redis`, reported by the health check
    pub store_backend: &'static str,
}

impl AppState {
    pub fn security(&self) -> &SecurityConfig {
        self.credentials.security()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("security", self.security())
            .field("roles", &self.roles)
            .field("cookies", &self.cookies)
            .field("store_backend", &self.store_backend)
            .finish_non_exhaustive()
    }
}
