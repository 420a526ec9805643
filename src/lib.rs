// Core modules
pub mod api;
pub mod config;
pub mod dashboard;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod scanner;
pub mod strategy;
pub mod synthetic;

// Re-export commonly used types
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
