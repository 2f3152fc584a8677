use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Enrollment lifecycle.
///
/// ```text
/// ENROLLED --progress 1..99--> IN_PROGRESS --progress 100--> COMPLETED
/// ENROLLED --progress 100------------------------------------> COMPLETED
/// {ENROLLED, IN_PROGRESS} --cancel--> CANCELLED
/// ```
///
/// CANCELLED and COMPLETED are terminal for progress; certificate issuance is
/// the only mutation allowed on COMPLETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "enrollment_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[sqlx(rename = "ENROLLED")]
    Enrolled,
    #[sqlx(rename = "IN_PROGRESS")]
    InProgress,
    #[sqlx(rename = "COMPLETED")]
    Completed,
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

/// Persistent enrollment row. `(student_id, course_id)` is unique at the
/// database level; that constraint, not the advisory pre-check, is the
/// authoritative duplicate guard.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub status: EnrollmentStatus,
    pub progress_percentage: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificate_issued: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub status: EnrollmentStatus,
    pub progress_percentage: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub certificate_issued: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        EnrollmentResponse {
            id: e.id,
            student_id: e.student_id,
            course_id: e.course_id,
            status: e.status,
            progress_percentage: e.progress_percentage,
            enrolled_at: e.enrolled_at,
            completed_at: e.completed_at,
            certificate_issued: e.certificate_issued,
            last_accessed_at: e.last_accessed_at,
        }
    }
}

/// A student's enrollment enriched with course metadata from the peer.
/// Enrichment is best-effort: peer failure leaves the course fields null.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyEnrollmentResponse {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    pub course_title: Option<String>,
    pub course_instructor_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProgressUpdateRequest {
    #[validate(range(min = 0, max = 100, message = "progress must be between 0 and 100"))]
    pub progress: i32,
}

/// Query parameters accepted by the listing endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EnrollmentListQuery {
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

fn default_page_size() -> i64 {
    10
}

impl EnrollmentListQuery {
    pub fn page_query(&self) -> pagination::PageQuery {
        pagination::PageQuery {
            page: self.page,
            size: self.size,
        }
        .clamped()
    }
}

/// Per-course aggregate for instructors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatsResponse {
    pub course_id: i64,
    pub total_enrollments: i64,
    pub enrolled_count: i64,
    pub in_progress_count: i64,
    pub completed_count: i64,
    pub cancelled_count: i64,
    pub average_progress: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(EnrollmentStatus::InProgress).unwrap(),
            serde_json::json!("IN_PROGRESS")
        );
        assert_eq!(
            serde_json::to_value(EnrollmentStatus::Cancelled).unwrap(),
            serde_json::json!("CANCELLED")
        );
    }

    #[test]
    fn response_flattens_course_fields() {
        let e = Enrollment {
            id: 1,
            student_id: 2,
            course_id: 3,
            status: EnrollmentStatus::Enrolled,
            progress_percentage: 0,
            enrolled_at: Utc::now(),
            completed_at: None,
            certificate_issued: false,
            last_accessed_at: None,
        };
        let enriched = MyEnrollmentResponse {
            enrollment: e.into(),
            course_title: Some("Databases".to_string()),
            course_instructor_id: Some(9),
        };
        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["courseId"], 3);
        assert_eq!(json["courseTitle"], "Databases");
        assert_eq!(json["courseInstructorId"], 9);
    }

    #[test]
    fn missing_paging_params_use_defaults() {
        let q: EnrollmentListQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(q.status.is_none());
        assert_eq!((q.page, q.size), (0, 10));
    }
}
