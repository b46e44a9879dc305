//! HTTP client building with a shared concurrency limit.

mod client;
mod retry;

pub use client::{
    shared_limiter, AuthenticatedClient, AuthenticatedClientBuilder, HttpClientConfig, LimitedResponse,
};
pub use retry::{is_transient_status, parse_retry_after};
