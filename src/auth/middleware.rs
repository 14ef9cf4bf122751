use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use super::jwt::JwtVerifier;
use crate::model::global_error::{AppError, ErrorCode};

/// Requires `Authorization: Bearer <token>` and stores the resulting `Actor`
/// in the request extensions.
#[derive(Clone)]
pub struct AuthMiddleware {
    verifier: Rc<JwtVerifier>,
}

impl AuthMiddleware {
    pub fn new(verifier: JwtVerifier) -> Self {
        Self {
            verifier: Rc::new(verifier),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    verifier: Rc<JwtVerifier>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth_result = match req.headers().get("Authorization") {
            Some(header_value) => match header_value.to_str().unwrap_or("").strip_prefix("Bearer ") {
                Some(token) => self.verifier.authenticate(token.trim()),
                None => Err(AppError::with_detail(
                    ErrorCode::AuthenticationFailed,
                    "invalid Authorization header format",
                )),
            },
            None => Err(AppError::with_detail(
                ErrorCode::AuthenticationFailed,
                "Authorization header missing",
            )),
        };

        match auth_result {
            Ok(actor) => {
                req.extensions_mut().insert(actor);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(err) => Box::pin(async move { Err(err.into()) }),
        }
    }
}
