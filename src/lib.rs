// Core modules
pub mod db;
pub mod error;
pub mod execution;
pub mod feed;
pub mod gateway;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod settings;
pub mod strategy;

// Re-export commonly used types
pub use models::*;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
