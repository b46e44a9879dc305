//! Errors raised while wiring providers into an engine.
//!
//! Failures of a running job are `transcription::Error`; this type only covers
//! startup, before any audio is sent.
use provider_auth::error::{
    ApiKeyErrorKind, Error as ProviderAuthError, ErrorKind as ProviderAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// The configuration cannot produce a usable engine.
    Config(ConfigErrorKind),
    /// An HTTP client for a provider could not be built.
    Client,
}

#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    /// The default provider has no API key.
    MissingDefaultProvider(String),
    /// A key is present but cannot be sent as a header.
    MalformedApiKey,
    /// A key is set but empty.
    MissingApiKey,
}

impl Error {
    pub(crate) fn missing_default_provider(provider_id: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Config(ConfigErrorKind::MissingDefaultProvider(
                provider_id.to_string(),
            )),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            DomainErrorKind::Config(ConfigErrorKind::MissingDefaultProvider(id)) => {
                write!(f, "no API key configured for the default provider '{id}'")
            }
            DomainErrorKind::Config(ConfigErrorKind::MalformedApiKey) => {
                write!(f, "a provider API key is malformed")
            }
            DomainErrorKind::Config(ConfigErrorKind::MissingApiKey) => {
                write!(f, "a provider API key is empty")
            }
            DomainErrorKind::Client => write!(f, "could not build a provider HTTP client"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<ProviderAuthError> for Error {
    fn from(err: ProviderAuthError) -> Self {
        let error_kind = match &err.error_kind {
            ProviderAuthErrorKind::ApiKey(ApiKeyErrorKind::InvalidFormat) => {
                DomainErrorKind::Config(ConfigErrorKind::MalformedApiKey)
            }
            ProviderAuthErrorKind::ApiKey(ApiKeyErrorKind::NotFound) => {
                DomainErrorKind::Config(ConfigErrorKind::MissingApiKey)
            }
            ProviderAuthErrorKind::Http(_) => DomainErrorKind::Client,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_auth::error::{api_key_error, http_error, HttpErrorKind};

    #[test]
    fn test_key_errors_are_config_errors() {
        let err: Error = api_key_error(ApiKeyErrorKind::InvalidFormat, "sk x").into();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Config(ConfigErrorKind::MalformedApiKey)
        );
        assert!(!err.to_string().contains("sk x"));
    }

    #[test]
    fn test_builder_failure_is_a_client_error() {
        let err: Error = http_error(HttpErrorKind::BuilderFailed, "tls").into();
        assert_eq!(err.error_kind, DomainErrorKind::Client);
    }

    #[test]
    fn test_missing_default_names_the_provider() {
        let err = Error::missing_default_provider("openai_whisper");
        assert_eq!(
            err.to_string(),
            "no API key configured for the default provider 'openai_whisper'"
        );
    }
}
