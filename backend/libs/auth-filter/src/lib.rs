//! Per-request credential verification for LearnHub services.
//!
//! The filter runs before any business logic, verifies the bearer credential
//! locally and attaches a [`CallerIdentity`] to the request. A missing or bad
//! token is not an error here: public endpoints stay reachable, and protected
//! endpoints reject uniformly later through the [`CallerIdentity`] extractor.

mod identity;
mod middleware;

pub use identity::{CallerIdentity, MaybeIdentity};
pub use middleware::AuthenticationFilter;

use actix_web::http::header;
use actix_web::HttpRequest;

/// Returns the raw `Authorization` header value, if any, for forwarding a
/// caller's credential unchanged to a peer service.
pub fn bearer_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::AuthenticationFilter;
    use actix_web::{test, web, App, HttpResponse};
    use api_error::{ApiResult, ErrorEnvelope};
    use jwt_auth::{JwtAuthority, Role, TokenType};
    use std::sync::Arc;

    const SECRET: &str = "filter-test-secret";

    fn authority() -> Arc<JwtAuthority> {
        Arc::new(JwtAuthority::new(SECRET, 3600, 7200))
    }

    async fn whoami(caller: CallerIdentity) -> ApiResult<HttpResponse> {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "userId": caller.user_id,
            "username": caller.username,
            "role": caller.role,
        })))
    }

    async fn public(identity: MaybeIdentity) -> ApiResult<HttpResponse> {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "anonymous": identity.0.is_none(),
        })))
    }

    macro_rules! test_app {
        ($auth:expr) => {
            test::init_service(
                App::new()
                    .wrap(ErrorEnvelope)
                    .wrap(AuthenticationFilter::new($auth))
                    .route("/me", web::get().to(whoami))
                    .route("/public", web::get().to(public)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn valid_access_token_attaches_identity() {
        let auth = authority();
        let token = auth.issue(7, "alice", Role::Student, TokenType::Access).unwrap();
        let srv = test_app!(auth);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let res = test::call_service(&srv, req).await;
        assert!(res.status().is_success());

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["userId"], 7);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["role"], "STUDENT");
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized_on_protected_routes() {
        let srv = test_app!(authority());

        let req = test::TestRequest::get().uri("/me").to_request();
        let res = test::call_service(&srv, req).await;
        assert_eq!(res.status().as_u16(), 401);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], 401);
        assert_eq!(body["path"], "/me");
    }

    #[actix_web::test]
    async fn bad_token_does_not_break_public_routes() {
        let srv = test_app!(authority());

        let req = test::TestRequest::get()
            .uri("/public")
            .insert_header(("Authorization", "Bearer garbage"))
            .to_request();
        let res = test::call_service(&srv, req).await;
        assert!(res.status().is_success());

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["anonymous"], true);
    }

    #[actix_web::test]
    async fn refresh_token_never_yields_an_identity() {
        let auth = authority();
        let refresh = auth.issue(7, "alice", Role::Student, TokenType::Refresh).unwrap();
        let srv = test_app!(auth);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        let res = test::call_service(&srv, req).await;
        assert_eq!(res.status().as_u16(), 401);
    }

    #[actix_web::test]
    async fn expired_token_is_unauthorized_on_protected_routes() {
        let auth = authority();
        let expired = JwtAuthority::new(SECRET, -120, -120)
            .issue(7, "alice", Role::Student, TokenType::Access)
            .unwrap();
        let srv = test_app!(auth);

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {expired}")))
            .to_request();
        let res = test::call_service(&srv, req).await;
        assert_eq!(res.status().as_u16(), 401);
    }
}
