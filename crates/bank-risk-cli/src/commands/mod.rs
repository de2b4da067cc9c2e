pub mod config;
pub mod credit;
pub mod market;
pub mod operational;
pub mod regulatory;
