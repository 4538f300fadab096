use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{ready, Ready};

use crate::auth::claims::AccessClaims;
use crate::domain::Role;
use crate::error::AppError;

/// Identity attached by `AuthGate`. Routes outside the gate get a 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSubject {
    pub external_id: String,
    pub customer_id: String,
    pub role: Role,
    /// Unix seconds
    pub expires_at: i64,
}

impl From<AccessClaims> for CurrentSubject {
    fn from(claims: AccessClaims) -> Self {
        Self {
            external_id: claims.sub,
            customer_id: claims.cid,
            role: claims.role,
            expires_at: claims.exp,
        }
    }
}

impl FromRequest for CurrentSubject {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AccessClaims>()
                .cloned()
                .map(CurrentSubject::from)
                .ok_or_else(AppError::unauthorized),
        )
    }
}
