//! API key authentication for the speech-to-text providers.

mod auth;
mod bearer;

pub use auth::{for_provider, ApiKeyAuth, ApiKeyProvider, ProviderAuth};
pub use bearer::BearerTokenAuth;
