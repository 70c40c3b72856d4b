// Q&A forum backend - questions, answers, comments, votes and reputation

// HTTP surface
pub mod api;
pub mod app_state;

// Storage backends and collaborators
pub mod infrastructure;

// Typed records
pub mod models;

// Orchestration and application services
pub mod services;

// Common utilities
pub mod config;
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
