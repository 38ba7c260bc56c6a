pub mod business;
pub mod opportunity;
pub mod scorecard;
