use actix_web::{web, HttpResponse};
use api_error::{ApiError, ApiResult};
use auth_filter::CallerIdentity;
use chrono::Utc;
use jwt_auth::{JwtAuthority, Role, TokenType};
use pagination::PageResponse;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::db::users;
use crate::models::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, UserListQuery, UserProfile,
};
use crate::security::password;

pub async fn register(
    pool: web::Data<PgPool>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let req = payload.into_inner();
    req.validate()?;

    if req.password != req.confirm_password {
        return Err(ApiError::validation_field(
            "confirmPassword",
            "passwords do not match",
        ));
    }

    if users::username_exists(&pool, &req.username).await? {
        return Err(ApiError::conflict("Username is already taken"));
    }
    if users::email_exists(&pool, &req.email).await? {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let hash = password::hash_password(&req.password)?;
    let user = users::create_user(
        &pool,
        &req.username,
        &req.email,
        &hash,
        &req.full_name,
        req.role.as_str(),
    )
    .await
    .map_err(|e| {
        // Concurrent registration can slip past the pre-checks.
        if api_error::is_unique_violation(&e) {
            ApiError::conflict("Username or email is already taken")
        } else {
            e.into()
        }
    })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(HttpResponse::Created().json(UserProfile::from_user(&user)?))
}

pub async fn login(
    pool: web::Data<PgPool>,
    authority: web::Data<Arc<JwtAuthority>>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let req = payload.into_inner();
    req.validate()?;

    // One message for both unknown-user and bad-password, so callers
    // cannot probe which usernames exist.
    let user = users::find_by_username(&pool, &req.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let role = user.role()?;
    let tokens = authority
        .issue_pair(user.id, &user.username, role)
        .map_err(issuance_error)?;
    users::touch_last_login(&pool, user.id, Utc::now()).await?;

    info!(user_id = user.id, "login succeeded");
    Ok(HttpResponse::Ok().json(LoginResponse {
        tokens,
        user: UserProfile::from_user(&user)?,
    }))
}

pub async fn refresh(
    pool: web::Data<PgPool>,
    authority: web::Data<Arc<JwtAuthority>>,
    payload: web::Json<RefreshTokenRequest>,
) -> ApiResult<HttpResponse> {
    let claims = authority
        .verify_typed(&payload.refresh_token, TokenType::Refresh)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    // Re-load the user so a role change or deletion takes effect at
    // the next refresh rather than living for the whole refresh TTL.
    let user = users::find_by_id(&pool, claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let role = user.role()?;
    let tokens = authority
        .issue_pair(user.id, &user.username, role)
        .map_err(issuance_error)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        tokens,
        user: UserProfile::from_user(&user)?,
    }))
}

pub async fn me(pool: web::Data<PgPool>, caller: CallerIdentity) -> ApiResult<HttpResponse> {
    let user = users::find_by_id(&pool, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    Ok(HttpResponse::Ok().json(UserProfile::from_user(&user)?))
}

pub async fn list_users(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    query: web::Query<UserListQuery>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Admin)?;
    let q = query.into_inner();
    let page = q.page_query();

    let rows = users::list_users(&pool, q.search.as_deref(), page.limit(), page.offset()).await?;
    let total = users::count_users(&pool, q.search.as_deref()).await?;

    let content = rows
        .iter()
        .map(UserProfile::from_user)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(PageResponse::new(content, page, total)))
}

// A key that cannot be encoded is an operational fault, not a caller problem.
fn issuance_error(err: jwt_auth::TokenError) -> ApiError {
    ApiError::internal(format!("token issuance failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, ResponseError};
    use jwt_auth::TokenError;

    #[test]
    fn issuance_failure_is_internal_and_generic() {
        let err = issuance_error(TokenError::Invalid);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Unexpected error");
    }
}
