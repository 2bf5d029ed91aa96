pub mod check_answer;

pub use check_answer::consume_check_jobs;
