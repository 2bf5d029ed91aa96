pub mod auth;
pub mod category;
pub mod problem;
pub mod submission;
