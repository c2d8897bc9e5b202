//! HTTP transport for the Brigade backend
//!
//! One client, one base URL, no retries. Errors carry the retry
//! classification the sync layer turns into outcomes.

pub mod client;
pub mod error;

// Re-export commonly used items
pub use client::{HttpClient, HttpClientBuilder, HttpClientConfig};
pub use error::HttpError;
