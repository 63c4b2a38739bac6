//! HTTP handlers.

pub mod credentials;
pub mod import;
