use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, Ready};
use jwt_auth::{JwtAuthority, TokenError, TokenType};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use crate::identity::CallerIdentity;

/// Verifies the bearer credential and attaches a [`CallerIdentity`].
///
/// Never fails the request itself: endpoint-level extractors decide whether an
/// identity is required. The raw token is never logged.
pub struct AuthenticationFilter {
    authority: Arc<JwtAuthority>,
}

impl AuthenticationFilter {
    pub fn new(authority: Arc<JwtAuthority>) -> Self {
        Self { authority }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationFilter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationFilterService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationFilterService {
            service: Rc::new(service),
            authority: self.authority.clone(),
        }))
    }
}

pub struct AuthenticationFilterService<S> {
    service: Rc<S>,
    authority: Arc<JwtAuthority>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationFilterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let authority = self.authority.clone();

        Box::pin(async move {
            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::trim);

            if let Some(token) = token {
                match authority.verify(token) {
                    Ok(claims) if claims.typ == TokenType::Access => {
                        req.extensions_mut().insert(CallerIdentity {
                            user_id: claims.user_id,
                            username: claims.username,
                            role: claims.role,
                        });
                    }
                    Ok(_) => {
                        // Refresh token on an access path: no identity.
                        tracing::debug!(path = %req.path(), "refresh token presented as access credential");
                    }
                    // Expiry is routine churn; a bad signature may be a forgery.
                    Err(TokenError::Expired) => {
                        tracing::debug!(path = %req.path(), "expired credential");
                    }
                    Err(TokenError::Invalid) => {
                        tracing::warn!(path = %req.path(), "credential failed verification");
                    }
                }
            }

            service.call(req).await
        })
    }
}
