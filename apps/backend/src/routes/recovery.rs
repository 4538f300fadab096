//! `/api/password-reset`. Failures here are descriptive 400s, except
//! `request` which never says whether the email is registered.

use actix_extensible_rate_limit::RateLimiter;
use actix_web::middleware::Condition;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::errors::{DomainError, ErrorCode};
use crate::extractors::ValidatedJson;
use crate::middleware::rate_limit::recovery_rate_limit_config;
use crate::middleware::RateLimits;
use crate::services::ResetProof;
use crate::state::app_state::AppState;

pub const GENERIC_REQUEST_MESSAGE: &str =
    "If your email is registered, you'll receive a reset link";

#[derive(Debug, Deserialize)]
pub struct RequestResetBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetBody {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResetBody {
    pub token: Option<String>,
    pub otp: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    pub message: &'static str,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    pub email: String,
}

/// Validation failures get a field-specific code; everything else goes
/// through the recovery mapping.
fn recovery_error(validation_code: ErrorCode) -> impl Fn(DomainError) -> AppError {
    move |err| match err {
        DomainError::Validation(detail) => AppError::invalid(validation_code, detail),
        other => AppError::from_recovery(other),
    }
}

async fn request_reset(
    body: ValidatedJson<RequestResetBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state
        .recovery
        .request_reset(&body.email, OffsetDateTime::now_utc())
        .await
        .map_err(recovery_error(ErrorCode::InvalidEmail))?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: GENERIC_REQUEST_MESSAGE,
    }))
}

async fn verify_otp(
    body: ValidatedJson<VerifyOtpBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = state
        .recovery
        .verify_one_time_code(&body.email, &body.otp, OffsetDateTime::now_utc())
        .await
        .map_err(AppError::from_recovery)?;
    Ok(HttpResponse::Ok().json(VerifyOtpResponse {
        message: "OTP verified",
        token,
    }))
}

async fn complete(
    state: &AppState,
    proof: ResetProof,
    new_password: &str,
) -> Result<HttpResponse, AppError> {
    state
        .recovery
        .complete_reset(proof, new_password, OffsetDateTime::now_utc())
        .await
        .map_err(recovery_error(ErrorCode::WeakPassword))?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password has been reset successfully",
    }))
}

async fn reset(
    body: ValidatedJson<ResetBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    if body.token.trim().is_empty() {
        return Err(AppError::invalid(
            ErrorCode::MissingResetProof,
            "token is required",
        ));
    }
    complete(&state, ResetProof::Token(body.token), &body.new_password).await
}

/// Token wins when both are sent.
async fn reset_combined(
    body: ValidatedJson<CombinedResetBody>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let token = body.token.filter(|t| !t.trim().is_empty());
    let otp = body.otp.filter(|o| !o.trim().is_empty());
    let proof = match (token, otp) {
        (Some(token), _) => ResetProof::Token(token),
        (None, Some(otp)) => ResetProof::Code(otp),
        (None, None) => {
            return Err(AppError::invalid(
                ErrorCode::MissingResetProof,
                "token or otp is required",
            ))
        }
    };
    complete(&state, proof, &body.new_password).await
}

async fn verify_token(
    query: web::Query<VerifyTokenQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let claims = state
        .recovery
        .inspect_recovery_token(&query.token, OffsetDateTime::now_utc())
        .await
        .map_err(AppError::from_recovery)?;
    Ok(HttpResponse::Ok().json(VerifyTokenResponse {
        valid: true,
        email: claims.email,
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limits: &RateLimits) {
    let limited = || {
        Condition::new(
            limits.enabled,
            RateLimiter::builder(limits.backend.clone(), recovery_rate_limit_config().build())
                .add_headers()
                .build(),
        )
    };

    cfg.service(
        web::resource("/request")
            .wrap(limited())
            .route(web::post().to(request_reset)),
    )
    .service(
        web::resource("/verify-otp")
            .wrap(limited())
            .route(web::post().to(verify_otp)),
    )
    .service(
        web::resource("/reset")
            .wrap(limited())
            .route(web::post().to(reset)),
    )
    .service(
        web::resource("/reset-combined")
            .wrap(limited())
            .route(web::post().to(reset_combined)),
    )
    .route("/verify-token", web::get().to(verify_token));
}
