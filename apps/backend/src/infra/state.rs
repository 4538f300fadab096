use std::sync::Arc;

use tracing::info;

use crate::adapters::memory::{
    MemoryEphemeralStore, MemoryRevocationLedger, MemorySessionRepo, MemorySubjectRepo,
};
use crate::adapters::redis_store::{
    self, RedisEphemeralStore, RedisRevocationLedger, RedisSessionRepo, RedisSubjectRepo,
};
use crate::config::{AppConfig, IdentityConfig, MailRelayConfig, StoreBackend};
use crate::domain::RolePermissions;
use crate::error::AppError;
use crate::identity_provider::{AssertionVerifier, FirebaseVerifier};
use crate::mail::{HttpRelayMailer, LogMailer, Mailer};
use crate::password::{Argon2Hashing, PasswordHashing};
use crate::repos::{EphemeralStore, RevocationLedger, SessionRepo, SubjectRepo};
use crate::services::{CredentialService, IdentityResolver, RecoveryFlow, SessionRegistry};
use crate::state::app_state::AppState;
use crate::state::security_config::{CookiePolicy, RecoveryPolicy, SecurityConfig, SessionPolicy};

const REDIS_NAMESPACE: &str = "zen";

struct Stores {
    subjects: Arc<dyn SubjectRepo>,
    ledger: Arc<dyn RevocationLedger>,
    sessions: Arc<dyn SessionRepo>,
    ephemeral: Arc<dyn EphemeralStore>,
}

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    security_config: SecurityConfig,
    session_policy: SessionPolicy,
    recovery_policy: RecoveryPolicy,
    cookie_policy: CookiePolicy,
    roles: RolePermissions,
    backend: StoreBackend,
    identity: Option<IdentityConfig>,
    verifier: Option<Arc<dyn AssertionVerifier>>,
    mailer: Option<Arc<dyn Mailer>>,
    hasher: Option<Arc<dyn PasswordHashing>>,
    ledger: Option<Arc<dyn RevocationLedger>>,
    mail_relay: Option<MailRelayConfig>,
}

impl StateBuilder {
    pub fn new(security_config: SecurityConfig) -> Self {
        Self {
            security_config,
            session_policy: SessionPolicy::default(),
            recovery_policy: RecoveryPolicy::default(),
            cookie_policy: CookiePolicy::default(),
            roles: RolePermissions::default(),
            backend: StoreBackend::Memory,
            identity: None,
            verifier: None,
            mailer: None,
            hasher: None,
            ledger: None,
            mail_relay: None,
        }
    }

    /// Everything from the loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut builder = Self::new(config.security.clone())
            .with_session_policy(config.sessions.clone())
            .with_recovery_policy(config.recovery.clone())
            .with_cookie_policy(config.cookies.clone())
            .with_roles(config.roles.clone())
            .with_backend(config.store.clone());
        builder.identity = Some(config.identity.clone());
        builder.mail_relay = config.mail.clone();
        builder
    }

    pub fn with_security(mut self, security_config: SecurityConfig) -> Self {
        self.security_config = security_config;
        self
    }
    pub fn with_session_policy(mut self, policy: SessionPolicy) -> Self {
        self.session_policy = policy;
        self
    }
    pub fn with_recovery_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.recovery_policy = policy;
        self
    }
    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = policy;
        self
    }
    pub fn with_roles(mut self, roles: RolePermissions) -> Self {
        self.roles = roles;
        self
    }
    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }
    pub fn with_verifier(mut self, verifier: Arc<dyn AssertionVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHashing>) -> Self {
        self.hasher = Some(hasher);
        self
    }
    /// Replace the backend's revocation ledger (fault injection in tests).
    pub fn with_ledger(mut self, ledger: Arc<dyn RevocationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        if self.security_config.jwt_secret.is_empty() {
            return Err(AppError::config("JWT signing key is not configured"));
        }

        let (stores, store_backend) = match &self.backend {
            StoreBackend::Memory => (memory_stores(), "memory"),
            StoreBackend::Redis { url } => (redis_stores(url).await?, "redis"),
        };
        let ledger = self.ledger.unwrap_or(stores.ledger);

        let verifier: Arc<dyn AssertionVerifier> = match (self.verifier, &self.identity) {
            (Some(verifier), _) => verifier,
            (None, Some(identity)) => Arc::new(FirebaseVerifier::new(identity)?),
            (None, None) => {
                return Err(AppError::config("no identity assertion verifier configured"))
            }
        };
        let mailer: Arc<dyn Mailer> = match (self.mailer, self.mail_relay) {
            (Some(mailer), _) => mailer,
            (None, Some(relay)) => Arc::new(HttpRelayMailer::new(relay)?),
            (None, None) => Arc::new(LogMailer),
        };
        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(Argon2Hashing::default()));

        let credentials = CredentialService::new(self.security_config, ledger);
        let sessions = SessionRegistry::new(stores.sessions, self.session_policy);
        let identity = IdentityResolver::new(
            verifier,
            stores.subjects.clone(),
            sessions.clone(),
            credentials.clone(),
            hasher.clone(),
        );
        let recovery = RecoveryFlow::new(
            stores.subjects.clone(),
            stores.ephemeral,
            mailer,
            hasher,
            credentials.clone(),
            self.recovery_policy,
        );

        info!(store_backend, "application state built");
        Ok(AppState {
            credentials,
            identity,
            sessions,
            recovery,
            subjects: stores.subjects,
            roles: Arc::new(self.roles),
            cookies: self.cookie_policy,
            store_backend,
        })
    }
}

fn memory_stores() -> Stores {
    Stores {
        subjects: Arc::new(MemorySubjectRepo::new()),
        ledger: Arc::new(MemoryRevocationLedger::new()),
        sessions: Arc::new(MemorySessionRepo::new()),
        ephemeral: Arc::new(MemoryEphemeralStore::new()),
    }
}

async fn redis_stores(url: &str) -> Result<Stores, AppError> {
    let conn = redis_store::connect(url).await?;
    Ok(Stores {
        subjects: Arc::new(RedisSubjectRepo::new(conn.clone(), REDIS_NAMESPACE)),
        ledger: Arc::new(RedisRevocationLedger::new(conn.clone(), REDIS_NAMESPACE)),
        sessions: Arc::new(RedisSessionRepo::new(conn.clone(), REDIS_NAMESPACE)),
        ephemeral: Arc::new(RedisEphemeralStore::new(conn, REDIS_NAMESPACE)),
    })
}

pub fn build_state(security_config: SecurityConfig) -> StateBuilder {
    StateBuilder::new(security_config)
}
