pub mod auth;
pub mod category;
pub mod problem;
pub mod shared;
pub mod submission;
