pub mod check_job;
pub mod check_state;
pub mod config;
pub mod grading;

pub use check_job::CheckJob;
pub use check_state::CheckState;
