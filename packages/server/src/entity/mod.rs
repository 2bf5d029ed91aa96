pub mod answer;
pub mod category;
pub mod commentary;
pub mod problem;
pub mod solution;
pub mod submission;
pub mod user;
