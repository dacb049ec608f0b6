//! Rendering services: view lookup, formatting, and the per-request render context.

pub mod context;
pub mod error;
pub mod format;
pub mod resolver;
