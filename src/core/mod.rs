pub mod bond;
pub mod candidate;
pub mod deal;
pub mod label;
