use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Publication state of a course. Only PUBLISHED courses accept enrollments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "course_status")]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseStatus {
    #[sqlx(rename = "DRAFT")]
    Draft,
    #[sqlx(rename = "PUBLISHED")]
    Published,
    #[sqlx(rename = "ARCHIVED")]
    Archived,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: i64,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire shape consumed by clients and by the enrollment peer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: i64,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        CourseResponse {
            id: course.id,
            title: course.title,
            description: course.description,
            instructor_id: course.instructor_id,
            status: course.status,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Body shared by course creation and update.
#[derive(Debug, Deserialize, Validate)]
pub struct CourseRequest {
    #[validate(length(min = 3, max = 200, message = "title must be 3-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "description must be at most 5000 characters"))]
    pub description: Option<String>,
}
