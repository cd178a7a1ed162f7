//! Read-only HTTP status export.

pub mod http;

pub use http::{router, serve};
