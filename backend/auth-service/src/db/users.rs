use crate::models::User;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, password_hash, full_name, role,
                  created_at, updated_at, last_login_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role)
    .fetch_one(pool)
    .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, full_name, role,
               created_at, updated_at, last_login_at
        FROM users
        WHERE lower(username) = lower($1)
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, full_name, role,
               created_at, updated_at, last_login_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE lower(username) = lower($1))",
    )
    .bind(username)
    .fetch_one(pool)
    .await
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await
}

pub async fn list_users(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<User>, sqlx::Error> {
    let pattern = search.map(|s| format!("%{s}%"));
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, full_name, role,
               created_at, updated_at, last_login_at
        FROM users
        WHERE $1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
        ORDER BY username
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_users(pool: &PgPool, search: Option<&str>) -> Result<i64, sqlx::Error> {
    let pattern = search.map(|s| format!("%{s}%"));
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE $1::text IS NULL OR username ILIKE $1 OR email ILIKE $1
        "#,
    )
    .bind(pattern)
    .fetch_one(pool)
    .await
}

/// Audit metadata only; not used for authentication decisions.
pub async fn touch_last_login(
    pool: &PgPool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $1, updated_at = now() WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
