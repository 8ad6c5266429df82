pub mod client;
pub mod error;
pub mod model;

pub use client::VirtualEducationApi;
pub use error::VirtualEducationError;
pub use model::{
    Course, CourseFilter, CoursePatch, Enrollment, EnrollmentFilter, EnrollmentPatch,
    EnrollmentStatus, ExpiringEnrollment, NewCourse, NewEnrollment, NewStudent, Page, PageRequest,
    Student, StudentFilter, StudentPatch,
};
