//! Type-directed view resolution and response capture for server-rendered pages.
//!
//! A [`RenderContext`](application::context::RenderContext) is built per request.
//! Its [`view`](application::context::RenderContext::view) method walks the model's
//! type chain, probes candidate template paths, forwards into the first dispatchable
//! page with an isolated request overlay and capture response, and writes the captured
//! text into the real response.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
