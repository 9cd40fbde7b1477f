//! Typed client for the messaging REST API.
//!
//! Responses are parsed into wire structs and converted into the model types
//! here; nothing untyped leaves this module.

mod client;
mod error;
mod wire;

pub use client::ApiClient;
pub use error::ApiError;
