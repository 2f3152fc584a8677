//! Enrollment orchestration: peer checks, ownership gates and persistence
//! around the pure state machine in [`crate::domain`].

use crate::clients::{CourseApi, CourseClientError};
use crate::db::enrollments as repo;
use crate::domain;
use crate::models::{
    CourseStatsResponse, Enrollment, EnrollmentStatus, MyEnrollmentResponse,
};
use crate::ownership;
use api_error::ApiError;
use auth_filter::CallerIdentity;
use jwt_auth::Role;
use pagination::{PageQuery, PageResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

const ALREADY_ENROLLED: &str = "Already enrolled in this course";

#[derive(Clone)]
pub struct EnrollmentService {
    pool: PgPool,
    courses: Arc<dyn CourseApi>,
}

impl EnrollmentService {
    pub fn new(pool: PgPool, courses: Arc<dyn CourseApi>) -> Self {
        Self { pool, courses }
    }

    /// Creates an enrollment. The pre-check is advisory; the database unique
    /// constraint is the authoritative guard, and a lost race reports the
    /// same conflict as the pre-check.
    pub async fn enroll(&self, student_id: i64, course_id: i64) -> Result<Enrollment, ApiError> {
        if repo::exists_for_pair(&self.pool, student_id, course_id).await? {
            return Err(ApiError::conflict(ALREADY_ENROLLED));
        }

        let course = self
            .courses
            .get_course(course_id)
            .await
            .map_err(|e| map_course_lookup_error(e, course_id))?;

        if !course.is_published() {
            return Err(ApiError::conflict("Course is not open for enrollment"));
        }

        let enrollment = repo::insert(&self.pool, student_id, course_id)
            .await
            .map_err(map_insert_error)?;

        info!(enrollment_id = enrollment.id, student_id, course_id, "student enrolled");
        Ok(enrollment)
    }

    pub async fn update_progress(
        &self,
        enrollment_id: i64,
        caller_student_id: i64,
        progress: i32,
    ) -> Result<Enrollment, ApiError> {
        let mut enrollment = self.owned_by_student(enrollment_id, caller_student_id).await?;
        if domain::apply_progress(&mut enrollment, progress)? {
            repo::update(&self.pool, &enrollment).await?;
        }
        Ok(enrollment)
    }

    pub async fn cancel(
        &self,
        enrollment_id: i64,
        caller_student_id: i64,
    ) -> Result<(), ApiError> {
        let mut enrollment = self.owned_by_student(enrollment_id, caller_student_id).await?;
        domain::cancel(&mut enrollment)?;
        repo::update(&self.pool, &enrollment).await?;
        info!(enrollment_id, "enrollment cancelled");
        Ok(())
    }

    pub async fn issue_certificate(
        &self,
        enrollment_id: i64,
        caller_student_id: i64,
    ) -> Result<Enrollment, ApiError> {
        let mut enrollment = self.owned_by_student(enrollment_id, caller_student_id).await?;
        domain::issue_certificate(&mut enrollment)?;
        repo::update(&self.pool, &enrollment).await?;
        info!(enrollment_id, "certificate issued");
        Ok(enrollment)
    }

    /// A student's own enrollments, each best-effort enriched with course
    /// metadata. Peer failure degrades to null fields, never to an error.
    pub async fn my_enrollments(
        &self,
        student_id: i64,
        status: Option<EnrollmentStatus>,
        page: PageQuery,
    ) -> Result<PageResponse<MyEnrollmentResponse>, ApiError> {
        let rows =
            repo::list_by_student(&self.pool, student_id, status, page.limit(), page.offset())
                .await?;
        let total = repo::count_by_student(&self.pool, student_id, status).await?;

        let mut content = Vec::with_capacity(rows.len());
        for enrollment in rows {
            let course = match self.courses.get_course(enrollment.course_id).await {
                Ok(course) => Some(course),
                Err(e) => {
                    debug!(course_id = enrollment.course_id, error = %e,
                        "course enrichment skipped");
                    None
                }
            };
            content.push(MyEnrollmentResponse {
                course_title: course.as_ref().map(|c| c.title.clone()),
                course_instructor_id: course.as_ref().map(|c| c.instructor_id),
                enrollment: enrollment.into(),
            });
        }

        Ok(PageResponse::new(content, page, total))
    }

    /// Single enrollment: ADMIN sees any, a student their own, an instructor
    /// those of courses they own (resolved remotely).
    pub async fn get_enrollment(
        &self,
        enrollment_id: i64,
        caller: &CallerIdentity,
        authorization: &str,
    ) -> Result<Enrollment, ApiError> {
        let enrollment = repo::find_by_id(&self.pool, enrollment_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;

        if caller.is_admin() || enrollment.student_id == caller.user_id {
            return Ok(enrollment);
        }
        if caller.role == Role::Instructor {
            ownership::require_course_owner(
                self.courses.as_ref(),
                caller,
                enrollment.course_id,
                authorization,
            )
            .await?;
            return Ok(enrollment);
        }
        Err(ApiError::forbidden("You cannot view this enrollment"))
    }

    pub async fn course_enrollments(
        &self,
        course_id: i64,
        caller: &CallerIdentity,
        authorization: &str,
        status: Option<EnrollmentStatus>,
        page: PageQuery,
    ) -> Result<PageResponse<Enrollment>, ApiError> {
        caller.require_any(&[Role::Instructor, Role::Admin])?;
        ownership::require_course_owner(self.courses.as_ref(), caller, course_id, authorization)
            .await?;

        let rows =
            repo::list_by_course(&self.pool, course_id, status, page.limit(), page.offset())
                .await?;
        let total = repo::count_by_course(&self.pool, course_id, status).await?;
        Ok(PageResponse::new(rows, page, total))
    }

    pub async fn course_stats(
        &self,
        course_id: i64,
        caller: &CallerIdentity,
        authorization: &str,
    ) -> Result<CourseStatsResponse, ApiError> {
        caller.require_any(&[Role::Instructor, Role::Admin])?;
        ownership::require_course_owner(self.courses.as_ref(), caller, course_id, authorization)
            .await?;

        let enrolled =
            repo::count_by_course_and_status(&self.pool, course_id, EnrollmentStatus::Enrolled)
                .await?;
        let in_progress =
            repo::count_by_course_and_status(&self.pool, course_id, EnrollmentStatus::InProgress)
                .await?;
        let completed =
            repo::count_by_course_and_status(&self.pool, course_id, EnrollmentStatus::Completed)
                .await?;
        let cancelled =
            repo::count_by_course_and_status(&self.pool, course_id, EnrollmentStatus::Cancelled)
                .await?;
        let average = repo::average_progress(&self.pool, course_id).await?;

        Ok(CourseStatsResponse {
            course_id,
            total_enrollments: enrolled + in_progress + completed + cancelled,
            enrolled_count: enrolled,
            in_progress_count: in_progress,
            completed_count: completed,
            cancelled_count: cancelled,
            average_progress: average,
        })
    }

    async fn owned_by_student(
        &self,
        enrollment_id: i64,
        caller_student_id: i64,
    ) -> Result<Enrollment, ApiError> {
        let enrollment = repo::find_by_id(&self.pool, enrollment_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Enrollment not found"))?;
        if enrollment.student_id != caller_student_id {
            return Err(ApiError::forbidden("This enrollment is not yours"));
        }
        Ok(enrollment)
    }
}

/// Maps peer failures during the pre-enrollment publication check. A missing
/// course is NotFound, an unreachable peer 503, and any other peer rejection
/// refuses the enrollment as a conflict.
fn map_course_lookup_error(err: CourseClientError, course_id: i64) -> ApiError {
    match err {
        CourseClientError::NotFound => ApiError::not_found("Course not found"),
        CourseClientError::Unavailable(reason) => {
            debug!(course_id, %reason, "course service unavailable during enroll");
            ApiError::upstream("Course service is unavailable")
        }
        CourseClientError::Rejected(_) => {
            ApiError::conflict("Course is not available for enrollment")
        }
    }
}

/// Translates a lost insert race (unique violation) into the same conflict
/// the advisory pre-check reports.
fn map_insert_error(err: sqlx::Error) -> ApiError {
    if api_error::is_unique_violation(&err) {
        ApiError::conflict(ALREADY_ENROLLED)
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct ConstraintViolation(&'static str);

    impl std::fmt::Display for ConstraintViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl std::error::Error for ConstraintViolation {}

    impl sqlx::error::DatabaseError for ConstraintViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(self.0.into())
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                "23505" => sqlx::error::ErrorKind::UniqueViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn lost_race_reports_the_same_conflict_as_the_pre_check() {
        let err = map_insert_error(sqlx::Error::Database(Box::new(ConstraintViolation("23505"))));
        match err {
            ApiError::Conflict(message) => assert_eq!(message, ALREADY_ENROLLED),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn other_database_failures_stay_internal() {
        let err = map_insert_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ApiError::Internal(_)));

        let err = map_insert_error(sqlx::Error::Database(Box::new(ConstraintViolation("23503"))));
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn course_lookup_failures_map_per_outcome() {
        assert!(matches!(
            map_course_lookup_error(CourseClientError::NotFound, 1),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            map_course_lookup_error(CourseClientError::Unavailable("timeout".to_string()), 1),
            ApiError::UpstreamUnavailable(_)
        ));
        match map_course_lookup_error(CourseClientError::Rejected(500), 1) {
            ApiError::Conflict(message) => {
                assert_eq!(message, "Course is not available for enrollment")
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }
}
