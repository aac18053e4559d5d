//! Cross-cutting HTTP and observability helpers for Courier services.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod task;
pub mod tracing;
