//! The `token` cookie: an alternative carrier for the access token.

use std::time::Duration;

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};

use crate::state::security_config::CookiePolicy;

pub const AUTH_COOKIE: &str = "token";

pub fn auth_cookie(token: &str, ttl: Duration, policy: &CookiePolicy) -> Cookie<'static> {
    let max_age = CookieDuration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
    Cookie::build(AUTH_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(policy.secure)
        .max_age(max_age)
        .finish()
}

/// Expires the cookie immediately.
pub fn cleared_auth_cookie(policy: &CookiePolicy) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(policy.secure)
        .max_age(CookieDuration::ZERO)
        .finish()
}
