//! Billing Gateway Library
//!
//! Exposes the gateway's handlers, services and stores for the binary and
//! for integration tests.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod routes;
pub mod services;
