use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use api_error::ApiError;
use futures::future::{ready, Ready};
use jwt_auth::Role;
use serde::Serialize;

/// Verified caller identity, derived from an access credential.
///
/// Lives in the request extensions for exactly one request; only the
/// [`AuthenticationFilter`](crate::AuthenticationFilter) produces it. Gateway
/// headers like `X-User-Id` are never a source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl CallerIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Forbidden` unless the caller holds the given role.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Requires {} role",
                role.as_str()
            )))
        }
    }

    /// Fails with `Forbidden` unless the caller holds one of the given roles.
    pub fn require_any(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Insufficient role"))
        }
    }
}

impl FromRequest for CallerIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CallerIdentity>() {
            Some(identity) => ready(Ok(identity.clone())),
            None => ready(Err(ApiError::unauthorized("Authentication required"))),
        }
    }
}

/// Optional identity for endpoints that serve both anonymous and
/// authenticated callers.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<CallerIdentity>);

impl FromRequest for MaybeIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(MaybeIdentity(
            req.extensions().get::<CallerIdentity>().cloned(),
        )))
    }
}
