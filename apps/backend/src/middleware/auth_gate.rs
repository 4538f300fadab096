//! Authenticates requests on protected scopes.
//!
//! Reads the bearer credential (header first, `token` cookie second),
//! verifies it through the credential service and stores the claims and raw
//! token in request extensions. Every failure becomes a uniform 401.

use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use time::OffsetDateTime;

use crate::auth::claims::AccessClaims;
use crate::error::AppError;
use crate::extractors::auth_token::{bearer_or_cookie, AuthToken};
use crate::logging::security;
use crate::state::app_state::AppState;

pub struct AuthGate;

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            match authenticate(&req).await {
                Ok((claims, token)) => {
                    req.extensions_mut().insert(claims);
                    req.extensions_mut().insert(token);
                    service
                        .call(req)
                        .await
                        .map(ServiceResponse::map_into_left_body)
                }
                // Rendered here so the body carries the request's trace id.
                Err(err) => Ok(req.error_response(err).map_into_right_body()),
            }
        })
    }
}

async fn authenticate(req: &ServiceRequest) -> Result<(AccessClaims, AuthToken), AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::internal("AppState not available"))?;

    let Some(token) = bearer_or_cookie(req.request())? else {
        security::auth_rejected("missing credentials");
        return Err(AppError::unauthorized());
    };

    match state
        .credentials
        .verify(&token, OffsetDateTime::now_utc())
        .await
    {
        Ok(claims) => Ok((claims, AuthToken { token })),
        Err(err) => {
            if err.is_auth_failure() {
                security::auth_rejected(&err.to_string());
            }
            Err(err.into())
        }
    }
}
