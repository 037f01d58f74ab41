//! Request handlers for API endpoints

pub mod health;
pub mod helpers;
pub mod subscription;

// Re-export handlers (and their OpenAPI path types)
pub use health::*;
pub use subscription::*;
