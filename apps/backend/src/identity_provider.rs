//! Verification of identity assertions issued by the external identity
//! provider (Firebase-style ID tokens signed with rotating RS256 keys).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::errors::{DomainError, InfraErrorKind};

/// What a verified assertion tells us about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub external_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait AssertionVerifier: Send + Sync {
    /// `InvalidAssertion` for anything the provider would not vouch for;
    /// `Unavailable` only when the provider's keys cannot be fetched.
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, DomainError>;
}

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FirebaseVerifier {
    client: reqwest::Client,
    jwks_url: String,
    project_id: String,
    keys: Cache<(), Arc<JwkSet>>,
}

impl FirebaseVerifier {
    pub fn new(config: &IdentityConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| DomainError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            jwks_url: config.jwks_url.clone(),
            project_id: config.project_id.clone(),
            keys: Cache::builder()
                .max_capacity(1)
                .time_to_live(JWKS_CACHE_TTL)
                .build(),
        })
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> Result<Arc<JwkSet>, DomainError> {
        let unavailable = |e: reqwest::Error| {
            warn!(error = %e, "identity provider key fetch failed");
            DomainError::unavailable(InfraErrorKind::IdentityProvider, e.to_string())
        };
        let set: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;
        debug!(keys = set.keys.len(), "fetched identity provider keys");
        Ok(Arc::new(set))
    }

    async fn keys(&self) -> Result<Arc<JwkSet>, DomainError> {
        self.keys
            .try_get_with((), self.fetch_keys())
            .await
            .map_err(|e: Arc<DomainError>| (*e).clone())
    }
}

#[async_trait]
impl AssertionVerifier for FirebaseVerifier {
    async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, DomainError> {
        let header = decode_header(assertion)
            .map_err(|e| DomainError::invalid_assertion(format!("bad header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(DomainError::invalid_assertion("unexpected algorithm"));
        }
        let kid = header
            .kid
            .ok_or_else(|| DomainError::invalid_assertion("missing kid"))?;

        let mut keys = self.keys().await?;
        if keys.find(&kid).is_none() {
            // Keys rotate; refetch once before rejecting.
            self.keys.invalidate(&()).await;
            keys = self.keys().await?;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| DomainError::invalid_assertion("unknown signing key"))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| DomainError::invalid_assertion(format!("unusable key: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);

        let claims = decode::<ProviderClaims>(assertion, &key, &validation)
            .map_err(|e| DomainError::invalid_assertion(e.to_string()))?
            .claims;
        if claims.sub.is_empty() {
            return Err(DomainError::invalid_assertion("empty subject"));
        }

        Ok(VerifiedIdentity {
            external_id: claims.sub,
            name: claims.name,
            email: claims.email,
        })
    }
}
