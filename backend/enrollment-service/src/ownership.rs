//! Remote course ownership resolution.
//!
//! Instructor-facing views are gated on owning the course, which lives in the
//! course peer. ADMIN short-circuits without a network call. Peer failures map
//! to distinct outcomes: a missing course is NotFound, an unreachable peer is
//! UpstreamUnavailable. Neither is ever treated as "not owned" or "owned".

use crate::clients::{CourseApi, CourseClientError};
use api_error::ApiError;
use auth_filter::CallerIdentity;
use tracing::warn;

pub async fn require_course_owner(
    courses: &dyn CourseApi,
    caller: &CallerIdentity,
    course_id: i64,
    authorization: &str,
) -> Result<(), ApiError> {
    if caller.is_admin() {
        return Ok(());
    }

    let course = courses
        .get_course_as_caller(course_id, authorization)
        .await
        .map_err(|e| map_peer_error(e, course_id))?;

    if course.instructor_id == caller.user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("You do not own this course"))
    }
}

fn map_peer_error(err: CourseClientError, course_id: i64) -> ApiError {
    match err {
        CourseClientError::NotFound => ApiError::not_found("Course not found"),
        CourseClientError::Unavailable(reason) => {
            warn!(course_id, %reason, "course service unavailable during ownership check");
            ApiError::upstream("Course service is unavailable")
        }
        CourseClientError::Rejected(status) => {
            warn!(course_id, status, "course service rejected forwarded credential");
            ApiError::forbidden("You do not own this course")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CourseSummary;
    use async_trait::async_trait;
    use jwt_auth::Role;

    struct StubCourses {
        instructor_id: i64,
    }

    #[async_trait]
    impl CourseApi for StubCourses {
        async fn get_course(&self, _: i64) -> Result<CourseSummary, CourseClientError> {
            unreachable!("ownership checks always carry the caller credential")
        }

        async fn get_course_as_caller(
            &self,
            course_id: i64,
            _: &str,
        ) -> Result<CourseSummary, CourseClientError> {
            Ok(CourseSummary {
                id: course_id,
                title: "Algorithms".to_string(),
                instructor_id: self.instructor_id,
                status: "PUBLISHED".to_string(),
            })
        }
    }

    struct FailingCourses {
        error: fn() -> CourseClientError,
    }

    #[async_trait]
    impl CourseApi for FailingCourses {
        async fn get_course(&self, _: i64) -> Result<CourseSummary, CourseClientError> {
            Err((self.error)())
        }

        async fn get_course_as_caller(
            &self,
            _: i64,
            _: &str,
        ) -> Result<CourseSummary, CourseClientError> {
            Err((self.error)())
        }
    }

    /// Any call proves the ADMIN fast path made a network round-trip.
    struct PanickingCourses;

    #[async_trait]
    impl CourseApi for PanickingCourses {
        async fn get_course(&self, _: i64) -> Result<CourseSummary, CourseClientError> {
            panic!("admin fast path must not call the peer");
        }

        async fn get_course_as_caller(
            &self,
            _: i64,
            _: &str,
        ) -> Result<CourseSummary, CourseClientError> {
            panic!("admin fast path must not call the peer");
        }
    }

    fn caller(user_id: i64, role: Role) -> CallerIdentity {
        CallerIdentity {
            user_id,
            username: "u".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn owner_is_allowed() {
        let courses = StubCourses { instructor_id: 42 };
        let result =
            require_course_owner(&courses, &caller(42, Role::Instructor), 1, "Bearer t").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn non_owner_is_forbidden() {
        let courses = StubCourses { instructor_id: 42 };
        let err = require_course_owner(&courses, &caller(7, Role::Instructor), 1, "Bearer t")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_skips_the_peer_entirely() {
        let result =
            require_course_owner(&PanickingCourses, &caller(7, Role::Admin), 1, "Bearer t").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_course_is_not_found_not_forbidden() {
        let courses = FailingCourses {
            error: || CourseClientError::NotFound,
        };
        let err = require_course_owner(&courses, &caller(7, Role::Instructor), 1, "Bearer t")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreachable_peer_is_unavailable_never_forbidden() {
        let courses = FailingCourses {
            error: || CourseClientError::Unavailable("connect timeout".to_string()),
        };
        let err = require_course_owner(&courses, &caller(7, Role::Instructor), 1, "Bearer t")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn peer_auth_rejection_is_forbidden() {
        let courses = FailingCourses {
            error: || CourseClientError::Rejected(401),
        };
        let err = require_course_owner(&courses, &caller(7, Role::Instructor), 1, "Bearer t")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
