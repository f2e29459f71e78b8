pub mod admin;
pub mod attendance;
pub mod core;
pub mod exams;
pub mod library;
pub mod setup;
