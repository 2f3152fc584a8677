use crate::models::{Enrollment, EnrollmentStatus};
use sqlx::PgPool;

pub async fn insert(
    pool: &PgPool,
    student_id: i64,
    course_id: i64,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, course_id, status, progress_percentage, certificate_issued)
        VALUES ($1, $2, 'ENROLLED', 0, FALSE)
        RETURNING id, student_id, course_id, status, progress_percentage,
                  enrolled_at, completed_at, certificate_issued, last_accessed_at
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, course_id, status, progress_percentage,
               enrolled_at, completed_at, certificate_issued, last_accessed_at
        FROM enrollments
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn exists_for_pair(
    pool: &PgPool,
    student_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM enrollments WHERE student_id = $1 AND course_id = $2)",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(pool)
    .await
}

/// Persists the mutable fields after a state-machine transition.
pub async fn update(pool: &PgPool, enrollment: &Enrollment) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE enrollments
        SET status = $1,
            progress_percentage = $2,
            completed_at = $3,
            certificate_issued = $4,
            last_accessed_at = $5
        WHERE id = $6
        "#,
    )
    .bind(enrollment.status)
    .bind(enrollment.progress_percentage)
    .bind(enrollment.completed_at)
    .bind(enrollment.certificate_issued)
    .bind(enrollment.last_accessed_at)
    .bind(enrollment.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_by_student(
    pool: &PgPool,
    student_id: i64,
    status: Option<EnrollmentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, course_id, status, progress_percentage,
               enrolled_at, completed_at, certificate_issued, last_accessed_at
        FROM enrollments
        WHERE student_id = $1 AND ($2::enrollment_status IS NULL OR status = $2)
        ORDER BY enrolled_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(student_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_by_student(
    pool: &PgPool,
    student_id: i64,
    status: Option<EnrollmentStatus>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM enrollments
        WHERE student_id = $1 AND ($2::enrollment_status IS NULL OR status = $2)
        "#,
    )
    .bind(student_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn list_by_course(
    pool: &PgPool,
    course_id: i64,
    status: Option<EnrollmentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, course_id, status, progress_percentage,
               enrolled_at, completed_at, certificate_issued, last_accessed_at
        FROM enrollments
        WHERE course_id = $1 AND ($2::enrollment_status IS NULL OR status = $2)
        ORDER BY enrolled_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(course_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_by_course(
    pool: &PgPool,
    course_id: i64,
    status: Option<EnrollmentStatus>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM enrollments
        WHERE course_id = $1 AND ($2::enrollment_status IS NULL OR status = $2)
        "#,
    )
    .bind(course_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn count_by_course_and_status(
    pool: &PgPool,
    course_id: i64,
    status: EnrollmentStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = $2",
    )
    .bind(course_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

/// Mean progress over every enrollment for the course. A course with no
/// enrollments reports 0, not NULL.
pub async fn average_progress(pool: &PgPool, course_id: i64) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(AVG(progress_percentage), 0)::float8 FROM enrollments WHERE course_id = $1",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
}
