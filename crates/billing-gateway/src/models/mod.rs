//! Data Transfer Objects (DTOs) for API requests and responses

pub mod auth;
pub mod common;
pub mod subscription;

// Re-exports
pub use auth::*;
pub use common::*;
pub use subscription::*;
