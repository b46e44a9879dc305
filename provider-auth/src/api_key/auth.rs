//! Provider keys and the raw-header scheme AssemblyAI uses.

use std::sync::Arc;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use super::BearerTokenAuth;
use crate::error::{api_key_error, ApiKeyErrorKind, Error};

/// Providers that authenticate with a static API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyProvider {
    AssemblyAi,
    OpenAi,
}

impl ApiKeyProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyProvider::AssemblyAi => "assemblyai",
            ApiKeyProvider::OpenAi => "openai_whisper",
        }
    }
}

/// Attaches credentials to an outgoing request.
pub trait ProviderAuth: Send + Sync {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Pick the header scheme the provider expects.
pub fn for_provider(
    provider: ApiKeyProvider,
    key: SecretString,
) -> Result<Arc<dyn ProviderAuth>, Error> {
    Ok(match provider {
        ApiKeyProvider::AssemblyAi => Arc::new(ApiKeyAuth::new(provider, key)?),
        ApiKeyProvider::OpenAi => Arc::new(BearerTokenAuth::new(provider, key)?),
    })
}

/// Trim surrounding whitespace, then refuse keys that cannot be sent as a header value.
pub(crate) fn normalize_key(provider: ApiKeyProvider, key: SecretString) -> Result<SecretString, Error> {
    let trimmed = key.expose_secret().trim();
    if trimmed.is_empty() {
        return Err(api_key_error(
            ApiKeyErrorKind::NotFound,
            &format!("no {} API key configured", provider.as_str()),
        ));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(api_key_error(
            ApiKeyErrorKind::InvalidFormat,
            &format!("{} API key contains whitespace", provider.as_str()),
        ));
    }
    Ok(SecretString::new(trimmed.to_string()))
}

/// Sends the key verbatim in a lowercase `authorization` header, with no scheme.
pub struct ApiKeyAuth {
    api_key: SecretString,
}

impl ApiKeyAuth {
    pub fn new(provider: ApiKeyProvider, api_key: SecretString) -> Result<Self, Error> {
        Ok(Self {
            api_key: normalize_key(provider, api_key)?,
        })
    }
}

impl ProviderAuth for ApiKeyAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("authorization", self.api_key.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn header_for(provider: ApiKeyProvider, key: &str) -> String {
        let auth = for_provider(provider, SecretString::new(key.to_string())).unwrap();
        let request = auth
            .authenticate(reqwest::Client::new().get("http://localhost/transcript"))
            .build()
            .unwrap();
        request.headers()["authorization"].to_str().unwrap().to_string()
    }

    #[test]
    fn test_assemblyai_gets_raw_key() {
        assert_eq!(header_for(ApiKeyProvider::AssemblyAi, "abc123"), "abc123");
    }

    #[test]
    fn test_openai_gets_bearer_scheme() {
        assert_eq!(header_for(ApiKeyProvider::OpenAi, "sk-test"), "Bearer sk-test");
    }

    #[test]
    fn test_surrounding_whitespace_from_env_files_is_trimmed() {
        assert_eq!(header_for(ApiKeyProvider::AssemblyAi, " abc123\n"), "abc123");
    }

    #[test]
    fn test_blank_key_is_not_found() {
        let result = ApiKeyAuth::new(ApiKeyProvider::AssemblyAi, SecretString::new("  ".to_string()));
        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(ErrorKind::ApiKey(ApiKeyErrorKind::NotFound))
        );
    }

    #[test]
    fn test_key_with_inner_whitespace_is_invalid() {
        let result = for_provider(ApiKeyProvider::OpenAi, SecretString::new("sk test".to_string()));
        assert_eq!(
            result.err().map(|e| e.error_kind),
            Some(ErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat))
        );
    }

    #[test]
    fn test_provider_ids_match_engine_ids() {
        assert_eq!(ApiKeyProvider::AssemblyAi.as_str(), "assemblyai");
        assert_eq!(ApiKeyProvider::OpenAi.as_str(), "openai_whisper");
    }
}
