// Admin gate for write endpoints: a Bearer JWT (HS256) whose `role` is "admin"

use crate::api::models::{ApiError, NOT_ADMIN, NO_TOKEN, TOKEN_FAILED};
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method},
    Error, HttpMessage, ResponseError,
};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;

/// Claims carried by tokens issued by the user service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Reads and mutating requests are told apart by method; only the latter need a token.
pub fn requires_admin(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_bearer)
}

/// `Bearer <token>`; the scheme must be followed by a space.
fn parse_bearer(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate `token` and require the admin role.
pub fn authorize(token: Option<&str>, key: &DecodingKey) -> Result<Claims, ApiError> {
    let token = token.ok_or(ApiError::Unauthorized(NO_TOKEN))?;
    let claims = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))
        .map_err(|err| {
            tracing::warn!(error = %err, "rejected bearer token");
            ApiError::Unauthorized(TOKEN_FAILED)
        })?
        .claims;
    if !claims.is_admin() {
        return Err(ApiError::Forbidden(NOT_ADMIN));
    }
    Ok(claims)
}

pub struct AdminAuth {
    key: Rc<DecodingKey>,
}

impl AdminAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Rc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminAuthMiddleware {
            service,
            key: self.key.clone(),
        }))
    }
}

pub struct AdminAuthMiddleware<S> {
    service: S,
    key: Rc<DecodingKey>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if requires_admin(req.method()) {
            match authorize(bearer_token(&req), &self.key) {
                Ok(claims) => {
                    tracing::debug!(user = %claims.id, path = %req.path(), "admin request");
                    req.extensions_mut().insert(claims);
                }
                Err(err) => {
                    let response = err.error_response().map_into_right_body();
                    return Box::pin(async move { Ok(req.into_response(response)) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}
