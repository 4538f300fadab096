//! Environment-driven configuration, read once at startup.

use std::env;
use std::time::Duration;

use crate::domain::RolePermissions;
use crate::error::AppError;
use crate::state::security_config::{
    CookiePolicy, RecoveryPolicy, RevocationFailMode, SecurityConfig, SessionPolicy,
};

const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String },
}

/// Where identity assertions are verified.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub project_id: String,
    pub jwks_url: String,
}

#[derive(Debug, Clone)]
pub struct MailRelayConfig {
    pub url: String,
    pub token: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub security: SecurityConfig,
    pub sessions: SessionPolicy,
    pub recovery: RecoveryPolicy,
    pub cookies: CookiePolicy,
    pub roles: RolePermissions,
    pub store: StoreBackend,
    pub identity: IdentityConfig,
    /// `None` means outbound mail is only logged.
    pub mail: Option<MailRelayConfig>,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let must_var = |name: &str| {
            var(name).ok_or_else(|| {
                AppError::config(format!("Required environment variable '{name}' is not set"))
            })
        };
        let duration_var = |name: &str, default: Duration| -> Result<Duration, AppError> {
            match var(name) {
                Some(raw) => parse_duration(&raw)
                    .map_err(|e| AppError::config(format!("{name}: {e}"))),
                None => Ok(default),
            }
        };

        let fail_mode = match var("REVOCATION_FAIL_MODE") {
            Some(raw) => raw
                .parse::<RevocationFailMode>()
                .map_err(|e| AppError::config(format!("REVOCATION_FAIL_MODE: {e}")))?,
            None => RevocationFailMode::Closed,
        };
        let security = SecurityConfig::new(must_var("JWT_SECRET_KEY")?.into_bytes())
            .with_access_ttl(duration_var("JWT_EXPIRES_IN", Duration::from_secs(3600))?)
            .with_fail_mode(fail_mode);

        let session_defaults = SessionPolicy::default();
        let sessions = SessionPolicy {
            retention: duration_var("SESSION_RETENTION", session_defaults.retention)?,
            ..session_defaults
        };

        let recovery_defaults = RecoveryPolicy::default();
        let recovery = RecoveryPolicy {
            code_ttl: duration_var("OTP_EXPIRES_IN", recovery_defaults.code_ttl)?,
            reset_token_ttl: duration_var(
                "RESET_TOKEN_EXPIRES_IN",
                recovery_defaults.reset_token_ttl,
            )?,
            confirm_token_ttl: duration_var(
                "CONFIRM_TOKEN_EXPIRES_IN",
                recovery_defaults.confirm_token_ttl,
            )?,
            frontend_url: var("FRONTEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(recovery_defaults.frontend_url),
            ..recovery_defaults
        };

        let cookies = CookiePolicy {
            secure: match var("COOKIE_SECURE") {
                Some(raw) => parse_bool(&raw)
                    .ok_or_else(|| AppError::config(format!("COOKIE_SECURE: '{raw}'")))?,
                None => true,
            },
        };

        let roles = match var("ROLE_PERMISSIONS") {
            Some(raw) => RolePermissions::from_json(&raw)?,
            None => RolePermissions::default(),
        };

        let store = match var("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => StoreBackend::Memory,
            Some(kind) if kind == "memory" => StoreBackend::Memory,
            Some(kind) if kind == "redis" => StoreBackend::Redis {
                url: must_var("REDIS_URL")?,
            },
            Some(other) => {
                return Err(AppError::config(format!(
                    "STORE_BACKEND must be 'memory' or 'redis', got '{other}'"
                )))
            }
        };

        let identity = IdentityConfig {
            project_id: must_var("FIREBASE_PROJECT_ID")?,
            jwks_url: var("IDENTITY_JWKS_URL").unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()),
        };

        let mail = match var("EMAIL_RELAY_URL") {
            Some(url) => Some(MailRelayConfig {
                url,
                token: var("EMAIL_RELAY_TOKEN"),
                from: var("EMAIL_FROM").unwrap_or_else(|| "no-reply@zen.app".to_string()),
            }),
            None => None,
        };

        let port = match var("BACKEND_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::config(format!("BACKEND_PORT: '{raw}'")))?,
            None => 3000,
        };

        let cors_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Ok(Self {
            security,
            sessions,
            recovery,
            cookies,
            roles,
            store,
            identity,
            mail,
            host: var("BACKEND_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            cors_origins,
        })
    }
}

/// Parse `3600`, `90s`, `15m`, `1h` or `7d`. Zero is rejected.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(format!("unknown duration unit in '{raw}'")),
    };
    match value.checked_mul(multiplier) {
        Some(0) => Err(format!("duration must be positive: '{raw}'")),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Err(format!("duration overflows: '{raw}'")),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
