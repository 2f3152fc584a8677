use api_error::ApiError;
use chrono::{DateTime, Utc};
use jwt_auth::{Role, TokenPair};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Persistent user row. The password hash never leaves this service.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    /// Stored as TEXT; parsed into [`Role`] at the trust boundary.
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role(&self) -> Result<Role, ApiError> {
        self.role
            .parse()
            .map_err(|_| ApiError::internal(format!("corrupt role for user {}", self.id)))
    }
}

/// Public profile, safe to return to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_user(user: &User) -> Result<Self, ApiError> {
        Ok(UserProfile {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role()?,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "email must be valid"))]
    pub email: String,
    #[validate(length(min = 8, max = 100, message = "password must be 8-100 characters"))]
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 1, max = 120, message = "fullName must be 1-120 characters"))]
    pub full_name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Login/refresh response: the token pair plus the resolved profile.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Query parameters for the admin user listing. `search` matches username or
/// email, case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_user_page_size")]
    pub size: i64,
}

fn default_user_page_size() -> i64 {
    20
}

impl UserListQuery {
    pub fn page_query(&self) -> pagination::PageQuery {
        pagination::PageQuery {
            page: self.page,
            size: self.size,
        }
        .clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_listing_defaults_and_clamping() {
        let q: UserListQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(q.search.is_none());
        assert_eq!((q.page, q.size), (0, 20));

        let q: UserListQuery =
            serde_json::from_value(serde_json::json!({"page": -5, "size": 9999})).unwrap();
        let page = q.page_query();
        assert_eq!((page.page, page.size), (0, 100));
    }
}
