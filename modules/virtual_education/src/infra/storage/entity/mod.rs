//! SeaORM entities. `students` only links a `users` row; the student's
//! personal data lives on the user.

pub mod course;
pub mod enrollment;
pub mod student;
pub mod user;
