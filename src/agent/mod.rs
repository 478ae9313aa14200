pub mod config;
pub mod daemon;
