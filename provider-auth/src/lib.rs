//! # provider-auth
//!
//! Authentication and HTTP plumbing shared by the speech-to-text adapters:
//! - API key and bearer token authentication (AssemblyAI, OpenAI)
//! - HTTP client building with a process-wide concurrency limit
//! - Retry-After parsing and transient status classification
//! - Default endpoints and limits per provider
//!
//! ## Usage
//!
//! ```rust,ignore
//! use provider_auth::{
//!     http::{shared_limiter, AuthenticatedClientBuilder},
//!     providers::assemblyai_config,
//! };
//!
//! let client = AuthenticatedClientBuilder::new()
//!     .with_auth(assemblyai_config().authenticator(key)?)
//!     .with_shared_limiter(shared_limiter(16))
//!     .build()?;
//! ```

pub mod api_key;
pub mod error;
pub mod http;
pub mod providers;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
