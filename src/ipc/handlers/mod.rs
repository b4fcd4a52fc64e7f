pub mod classes;
pub mod core;
pub mod exams;
pub mod marks;
pub mod reports;
pub mod school;
pub mod students;
