use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::error::AppError;
use crate::http::cookies::AUTH_COOKIE;

/// Raw access token the request authenticated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
}

/// Bearer header first, then the `token` cookie. A present but malformed
/// header is an error; it never falls back to the cookie.
pub fn bearer_or_cookie(req: &HttpRequest) -> Result<Option<String>, AppError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AppError::unauthorized())?;
        let mut parts = value.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some("Bearer"), Some(token), None) => Ok(Some(token.to_string())),
            _ => Err(AppError::unauthorized()),
        };
    }

    Ok(req
        .cookie(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

impl FromRequest for AuthToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Behind AuthGate the verified token is already in extensions.
        if let Some(token) = req.extensions().get::<AuthToken>() {
            return ready(Ok(token.clone()));
        }
        ready(match bearer_or_cookie(req) {
            Ok(Some(token)) => Ok(AuthToken { token }),
            Ok(None) => Err(AppError::unauthorized()),
            Err(err) => Err(err),
        })
    }
}

/// Like `AuthToken` but absence is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaybeAuthToken(pub Option<String>);

impl FromRequest for MaybeAuthToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(bearer_or_cookie(req).map(MaybeAuthToken))
    }
}
