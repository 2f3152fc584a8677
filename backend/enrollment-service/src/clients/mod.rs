pub mod course;

pub use course::{CourseApi, CourseClientError, CourseSummary, HttpCourseClient};
