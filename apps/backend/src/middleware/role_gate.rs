//! Role and permission checks for routes behind `AuthGate`.

use std::rc::Rc;

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::warn;

use crate::auth::claims::AccessClaims;
use crate::domain::{Permission, Role, RolePermissions};
use crate::error::AppError;
use crate::errors::DomainError;
use crate::state::app_state::AppState;

/// What a route requires. Empty roles and no permission means any
/// authenticated subject.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    roles: Vec<Role>,
    permission: Option<Permission>,
    owner_param: Option<&'static str>,
}

impl Policy {
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn permission(permission: Permission) -> Self {
        Self {
            permission: Some(permission),
            ..Self::default()
        }
    }

    /// Let the subject through regardless of role when the path parameter
    /// `param` equals their own customer id.
    pub fn or_owner(mut self, param: &'static str) -> Self {
        self.owner_param = Some(param);
        self
    }
}

/// `owner` is the value of the policy's owner path parameter, if any.
pub fn authorize(
    policy: &Policy,
    claims: &AccessClaims,
    table: &RolePermissions,
    owner: Option<&str>,
) -> Result<(), DomainError> {
    if policy.owner_param.is_some() && owner == Some(claims.cid.as_str()) {
        return Ok(());
    }
    if !policy.roles.is_empty() && !policy.roles.contains(&claims.role) {
        return Err(DomainError::forbidden("role not permitted"));
    }
    if let Some(permission) = policy.permission {
        if !table.grants(claims.role, permission) {
            return Err(DomainError::forbidden(format!(
                "missing permission {}",
                permission.as_str()
            )));
        }
    }
    Ok(())
}

pub struct RoleGate {
    policy: Rc<Policy>,
}

impl RoleGate {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy: Rc::new(policy),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RoleGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGateMiddleware {
            service,
            policy: Rc::clone(&self.policy),
        }))
    }
}

pub struct RoleGateMiddleware<S> {
    service: S,
    policy: Rc<Policy>,
}

impl<S, B> Service<ServiceRequest> for RoleGateMiddleware<S>
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
        match check(&req, &self.policy) {
            Ok(()) => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(err) => {
                let res = req.error_response(err).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

fn check(req: &ServiceRequest, policy: &Policy) -> Result<(), AppError> {
    let claims = req
        .extensions()
        .get::<AccessClaims>()
        .cloned()
        .ok_or_else(AppError::unauthorized)?;
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::internal("AppState not available"))?;
    let owner = policy.owner_param.and_then(|p| req.match_info().get(p));

    authorize(policy, &claims, &state.roles, owner).map_err(|err| {
        warn!(customer_id = %claims.cid, role = %claims.role, path = %req.path(), "authorization denied");
        AppError::from(err)
    })
}
