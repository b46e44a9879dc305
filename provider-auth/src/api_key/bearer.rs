//! Standard Bearer token authentication.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use super::auth::normalize_key;
use super::{ApiKeyProvider, ProviderAuth};
use crate::error::Error;

/// Uses the standard `Authorization: Bearer <token>` header pattern.
pub struct BearerTokenAuth {
    token: SecretString,
}

impl BearerTokenAuth {
    pub fn new(provider: ApiKeyProvider, token: SecretString) -> Result<Self, Error> {
        Ok(Self {
            token: normalize_key(provider, token)?,
        })
    }
}

impl ProviderAuth for BearerTokenAuth {
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.token.expose_secret())
    }
}
