use actix_web::web;

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::middleware::RateLimits;

pub mod auth;
pub mod health;
pub mod recovery;
pub mod users;

/// Mount every route. Global middleware (trace, logging, CORS) is added by
/// the caller; per-route gates and rate limits are applied here.
pub fn configure(cfg: &mut web::ServiceConfig, limits: &RateLimits) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::bad_request(ErrorCode::BadRequest, err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::bad_request(ErrorCode::BadRequest, err.to_string()).into()
    }))
    .configure(health::configure_routes)
    .service(web::scope("/api/auth").configure(auth::configure_routes))
    .service(web::scope("/api/users").configure(|cfg| users::configure_routes(cfg, limits)))
    .service(
        web::scope("/api/password-reset").configure(|cfg| recovery::configure_routes(cfg, limits)),
    );
}
