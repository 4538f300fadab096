//! `/api/users`: identity exchange, password login, session listing and
//! subject administration.

use std::str::FromStr;

use actix_extensible_rate_limit::RateLimiter;
use actix_web::middleware::Condition;
use actix_web::{guard, web, HttpResponse};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::email::normalize_email;
use crate::domain::{CustomerId, Permission, Role};
use crate::error::AppError;
use crate::errors::{DomainError, ErrorCode, NotFoundKind};
use crate::extractors::{CurrentSubject, ValidatedJson};
use crate::http::cookies::auth_cookie;
use crate::middleware::rate_limit::auth_rate_limit_config;
use crate::middleware::{AuthGate, Policy, RateLimits, RoleGate};
use crate::repos::{SessionFilter, SessionRecord, Subject};
use crate::services::ExchangeOutcome;
use crate::state::app_state::AppState;

const MAX_DISPLAY_NAME_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    pub id_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectView {
    pub external_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub customer_id: String,
    pub role: Role,
    pub has_password: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Subject> for SubjectView {
    fn from(s: &Subject) -> Self {
        Self {
            external_id: s.external_id.clone(),
            display_name: s.display_name.clone(),
            email: s.email.clone(),
            customer_id: s.customer_id.to_string(),
            role: s.role,
            has_password: s.password_hash.is_some(),
            created_at: s.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub customer_id: String,
    pub role: Role,
    pub is_new_user: bool,
    pub user: SubjectView,
}

fn signed_in(state: &AppState, outcome: ExchangeOutcome) -> HttpResponse {
    let cookie = auth_cookie(&outcome.access.token, outcome.access.ttl, &state.cookies);
    HttpResponse::Ok().cookie(cookie).json(AuthResponse {
        token: outcome.access.token,
        expires_at: outcome.access.expires_at,
        customer_id: outcome.subject.customer_id.to_string(),
        role: outcome.subject.role,
        is_new_user: outcome.created,
        user: SubjectView::from(&outcome.subject),
    })
}

async fn authenticate(
    body: ValidatedJson<AuthenticateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let assertion = body.id_token.trim();
    if assertion.is_empty() {
        return Err(AppError::invalid(
            ErrorCode::InvalidIdToken,
            "idToken is required",
        ));
    }
    let outcome = state
        .identity
        .exchange(assertion, OffsetDateTime::now_utc())
        .await?;
    Ok(signed_in(&state, outcome))
}

async fn login(
    body: ValidatedJson<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::invalid(
            ErrorCode::ValidationError,
            "email and password are required",
        ));
    }
    let outcome = state
        .identity
        .login_with_password(&body.email, &body.password, OffsetDateTime::now_utc())
        .await?;
    Ok(signed_in(&state, outcome))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    /// External id
    pub uid: Option<String>,
    pub email: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub count: usize,
    pub sessions: Vec<SessionRecord>,
}

async fn list_sessions(
    query: web::Query<SessionsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = SessionFilter {
        external_id: query.uid.filter(|s| !s.is_empty()),
        email: query
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|s| !s.is_empty()),
    };
    let sessions = state.sessions.list_sessions(&filter, query.limit).await?;
    Ok(HttpResponse::Ok().json(SessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}

async fn load_subject(state: &AppState, raw_id: &str) -> Result<Subject, AppError> {
    let id = CustomerId::parse(raw_id)?;
    state
        .subjects
        .find_by_customer_id(&id)
        .await?
        .ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Subject, format!("no subject {id}")).into()
        })
}

/// Owners reaching their own record still need the profile permission.
fn require_own_permission(
    state: &AppState,
    current: &CurrentSubject,
    customer_id: &str,
    permission: Permission,
) -> Result<(), AppError> {
    if current.customer_id == customer_id && !state.roles.grants(current.role, permission) {
        return Err(AppError::forbidden(
            ErrorCode::InsufficientRole,
            format!("missing permission {}", permission.as_str()),
        ));
    }
    Ok(())
}

async fn get_subject(
    path: web::Path<String>,
    current: CurrentSubject,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_own_permission(&state, &current, &path, Permission::ProfileRead)?;
    let subject = load_subject(&state, &path).await?;
    Ok(HttpResponse::Ok().json(SubjectView::from(&subject)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
}

async fn update_subject(
    path: web::Path<String>,
    current: CurrentSubject,
    body: ValidatedJson<UpdateProfileRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_own_permission(&state, &current, &path, Permission::ProfileWrite)?;
    let display_name = body
        .into_inner()
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if display_name
        .as_deref()
        .is_some_and(|n| n.chars().count() > MAX_DISPLAY_NAME_CHARS)
    {
        return Err(AppError::invalid(
            ErrorCode::ValidationError,
            format!("displayName must be at most {MAX_DISPLAY_NAME_CHARS} characters"),
        ));
    }
    let id = CustomerId::parse(&path)?;
    let subject = state.subjects.update_display_name(&id, display_name).await?;
    Ok(HttpResponse::Ok().json(SubjectView::from(&subject)))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

async fn set_role(
    path: web::Path<String>,
    body: ValidatedJson<SetRoleRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let role = Role::from_str(body.role.trim())
        .map_err(|_| AppError::invalid(ErrorCode::InvalidRole, "role must be 'user' or 'admin'"))?;
    let id = CustomerId::parse(&path)?;
    let subject = state.subjects.set_role(&id, role).await?;
    Ok(HttpResponse::Ok().json(SubjectView::from(&subject)))
}

async fn delete_subject(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = CustomerId::parse(&path)?;
    state.subjects.delete(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limits: &RateLimits) {
    let limited = || {
        Condition::new(
            limits.enabled,
            RateLimiter::builder(limits.backend.clone(), auth_rate_limit_config().build())
                .add_headers()
                .build(),
        )
    };
    let owner_or_admin = || Policy::permission(Permission::SubjectsManage).or_owner("customer_id");
    let admin_only = || Policy::permission(Permission::SubjectsManage);

    cfg.service(
        web::resource("/authenticate")
            .wrap(limited())
            .route(web::post().to(authenticate)),
    )
    .service(
        web::resource("/login")
            .wrap(limited())
            .route(web::post().to(login)),
    )
    // `/sessions` must be registered before the `{customer_id}` resources.
    .service(
        web::resource("/sessions")
            .wrap(RoleGate::new(Policy::permission(Permission::SessionsRead)))
            .wrap(AuthGate)
            .route(web::get().to(list_sessions)),
    )
    .service(
        web::resource("/{customer_id}")
            .guard(guard::Any(guard::Get()).or(guard::Patch()))
            .wrap(RoleGate::new(owner_or_admin()))
            .wrap(AuthGate)
            .route(web::get().to(get_subject))
            .route(web::patch().to(update_subject)),
    )
    .service(
        web::resource("/{customer_id}")
            .guard(guard::Delete())
            .wrap(RoleGate::new(admin_only()))
            .wrap(AuthGate)
            .route(web::delete().to(delete_subject)),
    )
    .service(
        web::resource("/{customer_id}/role")
            .wrap(RoleGate::new(admin_only()))
            .wrap(AuthGate)
            .route(web::put().to(set_role)),
    );
}
