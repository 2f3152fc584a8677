//! Pure enrollment state machine. Every mutation is expressed here against an
//! in-memory row and persisted afterwards, so the transition rules are testable
//! without a database.

use crate::models::{Enrollment, EnrollmentStatus};
use api_error::ApiError;
use chrono::Utc;

/// Applies a progress update. Returns `Ok(true)` when the row changed and
/// needs to be persisted, `Ok(false)` for the idempotent re-submission of 100
/// on an already completed enrollment.
pub fn apply_progress(enrollment: &mut Enrollment, progress: i32) -> Result<bool, ApiError> {
    if !(0..=100).contains(&progress) {
        return Err(ApiError::validation_field(
            "progress",
            "progress must be between 0 and 100",
        ));
    }

    match enrollment.status {
        EnrollmentStatus::Cancelled => {
            Err(ApiError::conflict("Enrollment has been cancelled"))
        }
        EnrollmentStatus::Completed => {
            if progress == 100 {
                // Re-submitting completion is harmless; completedAt stays as
                // it was first set.
                Ok(false)
            } else {
                Err(ApiError::conflict("Enrollment is already completed"))
            }
        }
        EnrollmentStatus::Enrolled | EnrollmentStatus::InProgress => {
            let now = Utc::now();
            enrollment.progress_percentage = progress;
            enrollment.last_accessed_at = Some(now);
            if progress == 100 {
                enrollment.status = EnrollmentStatus::Completed;
                enrollment.completed_at = Some(now);
            } else if progress > 0 {
                enrollment.status = EnrollmentStatus::InProgress;
            }
            Ok(true)
        }
    }
}

pub fn cancel(enrollment: &mut Enrollment) -> Result<(), ApiError> {
    match enrollment.status {
        EnrollmentStatus::Completed => {
            Err(ApiError::conflict("A completed enrollment cannot be cancelled"))
        }
        EnrollmentStatus::Cancelled => {
            Err(ApiError::conflict("Enrollment has already been cancelled"))
        }
        EnrollmentStatus::Enrolled | EnrollmentStatus::InProgress => {
            enrollment.status = EnrollmentStatus::Cancelled;
            Ok(())
        }
    }
}

pub fn issue_certificate(enrollment: &mut Enrollment) -> Result<(), ApiError> {
    if enrollment.status != EnrollmentStatus::Completed {
        return Err(ApiError::conflict(
            "Certificate requires a completed enrollment",
        ));
    }
    if enrollment.certificate_issued {
        return Err(ApiError::conflict("Certificate has already been issued"));
    }
    enrollment.certificate_issued = true;
    Ok(())
}
