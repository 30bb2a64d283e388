//! HTTP client and wire types for the product catalog REST API.

pub mod client;
pub mod error;
pub mod types;

pub use client::ProductClient;
pub use error::ApiError;
pub use types::{Product, ProductDraft};
