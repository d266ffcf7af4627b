pub mod cache;
pub mod config;
pub mod error;
pub mod icy;
pub mod journal;
pub mod platform;
