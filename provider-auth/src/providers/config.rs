//! Pre-configured provider settings.

use std::sync::Arc;

use secrecy::SecretString;

use crate::api_key::{for_provider, ApiKeyProvider, ProviderAuth};
use crate::error::Error;

/// Provider configuration with endpoints and settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub provider: ApiKeyProvider,
    /// Base API URL, without a trailing slash.
    pub base_url: String,
    /// Largest binary upload the provider accepts, in bytes.
    pub max_upload_bytes: usize,
}

impl ProviderConfig {
    /// Override the base URL, e.g. to point at a proxy or a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Authenticator for this provider's header scheme.
    pub fn authenticator(&self, api_key: SecretString) -> Result<Arc<dyn ProviderAuth>, Error> {
        for_provider(self.provider, api_key)
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Get AssemblyAI configuration.
pub fn assemblyai_config() -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::AssemblyAi,
        base_url: "https://api.assemblyai.com/v2".to_string(),
        max_upload_bytes: 2_200_000_000,
    }
}

/// Get OpenAI configuration. The transcription endpoint caps uploads at 25 MiB.
pub fn openai_config() -> ProviderConfig {
    ProviderConfig {
        provider: ApiKeyProvider::OpenAi,
        base_url: "https://api.openai.com/v1".to_string(),
        max_upload_bytes: 25 * 1024 * 1024,
    }
}
