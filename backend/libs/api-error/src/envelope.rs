//! Middleware that rewrites error responses into the stable envelope.
//!
//! `ResponseError::error_response` cannot see the request, so the `path` field
//! is filled in here, where both the request and the original error are
//! available. Identity and error context stay explicit per request; nothing is
//! stashed in thread-locals.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::{ApiError, ErrorBody, FieldErrorItem};

/// Wraps every response; failing ones are re-rendered as the envelope.
pub struct ErrorEnvelope;

impl<S, B> Transform<S, ServiceRequest> for ErrorEnvelope
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ErrorEnvelopeService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorEnvelopeService {
            service: Rc::new(service),
        }))
    }
}

pub struct ErrorEnvelopeService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ErrorEnvelopeService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_owned();

        Box::pin(async move {
            let res = service.call(req).await?;
            let status = res.status();

            if !status.is_client_error() && !status.is_server_error() {
                return Ok(res.map_into_left_body());
            }

            // Only responses produced from an error carry the original error;
            // anything else (e.g. a handler-built 404) is passed through as-is.
            let Some(err) = res.response().error() else {
                return Ok(res.map_into_left_body());
            };

            let (message, errors): (String, Vec<FieldErrorItem>) =
                match err.as_error::<ApiError>() {
                    Some(api) => (api.public_message(), api.field_errors()),
                    // Framework errors: payload/deserialization problems are
                    // client-facing; anything 5xx stays generic.
                    None if status.is_server_error() => ("Unexpected error".to_string(), Vec::new()),
                    None => (err.to_string(), Vec::new()),
                };

            if status.is_server_error() && status != actix_web::http::StatusCode::SERVICE_UNAVAILABLE
            {
                tracing::error!(%path, status = status.as_u16(), error = %err, "request failed");
            } else if status == actix_web::http::StatusCode::SERVICE_UNAVAILABLE {
                tracing::warn!(%path, status = status.as_u16(), error = %err, "upstream unavailable");
            } else {
                tracing::info!(%path, status = status.as_u16(), %message, "request rejected");
            }

            let body = ErrorBody::new(status.as_u16(), message, path, errors);
            let (req, _) = res.into_parts();
            let response = HttpResponse::build(status).json(body);
            Ok(ServiceResponse::new(req, response).map_into_right_body())
        })
    }
}
