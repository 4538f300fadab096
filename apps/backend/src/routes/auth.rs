//! `/api/auth`: token refresh, logout and validation.

use actix_web::{web, HttpResponse};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::domain::Role;
use crate::error::AppError;
use crate::extractors::{AuthToken, CurrentSubject, MaybeAuthToken};
use crate::http::cookies::{auth_cookie, cleared_auth_cookie};
use crate::logging::security;
use crate::middleware::AuthGate;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Revoke the presented token and issue a replacement.
async fn refresh_token(
    token: AuthToken,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let issued = state
        .credentials
        .refresh(&token.token, OffsetDateTime::now_utc())
        .await?;
    let cookie = auth_cookie(&issued.token, issued.ttl, &state.cookies);
    Ok(HttpResponse::Ok().cookie(cookie).json(RefreshResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

async fn logout(
    token: AuthToken,
    current: CurrentSubject,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .credentials
        .revoke(&token.token, OffsetDateTime::now_utc())
        .await?;
    security::token_revoked(&current.customer_id, "logout");
    Ok(HttpResponse::Ok()
        .cookie(cleared_auth_cookie(&state.cookies))
        .json(MessageResponse {
            message: "Logged out successfully",
        }))
}

/// 401 when nothing is presented; otherwise 200 with `valid`.
async fn validate_token(
    token: MaybeAuthToken,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let Some(token) = token.0 else {
        return Err(AppError::unauthorized());
    };
    let body = match state
        .credentials
        .verify(&token, OffsetDateTime::now_utc())
        .await
    {
        Ok(claims) => ValidateResponse {
            valid: true,
            customer_id: Some(claims.cid),
            role: Some(claims.role),
            expires_at: Some(claims.exp),
        },
        Err(err) if err.is_auth_failure() => ValidateResponse {
            valid: false,
            customer_id: None,
            role: None,
            expires_at: None,
        },
        Err(err) => return Err(err.into()),
    };
    Ok(HttpResponse::Ok().json(body))
}

/// Fired by the browser on tab close. Best effort: always clears the cookie.
async fn tab_close_logout(
    token: MaybeAuthToken,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Some(token) = token.0 {
        if let Err(err) = state
            .credentials
            .revoke(&token, OffsetDateTime::now_utc())
            .await
        {
            warn!(error = %err, "tab-close revocation failed");
        }
    }
    HttpResponse::Ok()
        .cookie(cleared_auth_cookie(&state.cookies))
        .json(MessageResponse {
            message: "Logged out successfully",
        })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/refresh-token")
            .wrap(AuthGate)
            .route(web::post().to(refresh_token)),
    )
    .service(
        web::resource("/logout")
            .wrap(AuthGate)
            .route(web::post().to(logout)),
    )
    .route("/validate-token", web::post().to(validate_token))
    .route("/tab-close-logout", web::get().to(tab_close_logout));
}
