pub mod enrollments;

pub use enrollments::EnrollmentService;
