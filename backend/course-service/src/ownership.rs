//! Local ownership check for course mutations. This service holds the
//! `instructor_id` column itself, so no peer call is involved.

use crate::models::Course;
use api_error::ApiError;
use auth_filter::CallerIdentity;

pub fn require_course_owner(course: &Course, caller: &CallerIdentity) -> Result<(), ApiError> {
    if caller.is_admin() {
        return Ok(());
    }
    if course.instructor_id == caller.user_id {
        return Ok(());
    }
    Err(ApiError::forbidden(
        "You do not own this course",
    ))
}
