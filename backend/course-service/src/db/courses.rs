use crate::models::{Course, CourseStatus};
use sqlx::PgPool;

pub async fn create_course(
    pool: &PgPool,
    title: &str,
    description: Option<&str>,
    instructor_id: i64,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses (title, description, instructor_id, status)
        VALUES ($1, $2, $3, 'DRAFT')
        RETURNING id, title, description, instructor_id, status, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(instructor_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, instructor_id, status, created_at, updated_at
        FROM courses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_published(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, instructor_id, status, created_at, updated_at
        FROM courses
        WHERE status = 'PUBLISHED'
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_published(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE status = 'PUBLISHED'")
        .fetch_one(pool)
        .await
}

pub async fn list_by_instructor(
    pool: &PgPool,
    instructor_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, title, description, instructor_id, status, created_at, updated_at
        FROM courses
        WHERE instructor_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(instructor_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_by_instructor(pool: &PgPool, instructor_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses WHERE instructor_id = $1")
        .bind(instructor_id)
        .fetch_one(pool)
        .await
}

pub async fn update_course(
    pool: &PgPool,
    id: i64,
    title: &str,
    description: Option<&str>,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses
        SET title = $1, description = $2, updated_at = now()
        WHERE id = $3
        RETURNING id, title, description, instructor_id, status, created_at, updated_at
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn delete_course(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_status(
    pool: &PgPool,
    id: i64,
    status: CourseStatus,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        UPDATE courses
        SET status = $1, updated_at = now()
        WHERE id = $2
        RETURNING id, title, description, instructor_id, status, created_at, updated_at
        "#,
    )
    .bind(status)
    .bind(id)
    .fetch_one(pool)
    .await
}
