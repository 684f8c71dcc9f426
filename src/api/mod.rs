//! API client module for the external query/aggregation service.

mod client;
pub mod types;

pub use client::{ApiClient, ApiError};
