pub mod backtrack;
pub mod config;
pub mod engine;
pub mod error;
pub mod greedy;
pub mod plan;
pub mod tally;
pub mod validator;
