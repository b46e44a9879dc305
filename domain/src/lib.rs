//! Concrete speech-to-text providers and engine construction.
//!
//! The `transcription` crate knows only the `Provider` trait; this crate owns the
//! HTTP gateways that implement it and wires them together from `Config`.

use std::sync::Arc;

use log::*;
use provider_auth::http::shared_limiter;
use provider_auth::providers::{assemblyai_config, openai_config};
use secrecy::SecretString;
use service::config::Config;
use transcription::{Provider, TranscriptionEngine};

use crate::error::Error;
use crate::gateway::assembly_ai::AssemblyAiClient;
use crate::gateway::openai_whisper::OpenAiWhisperClient;

pub mod error;
pub mod gateway;

/// Build an engine with every provider that has credentials configured.
///
/// All providers share one request limiter sized by `max_concurrent_requests`.
/// Fails when the configured default provider has no API key.
pub fn build_engine(config: &Config) -> Result<TranscriptionEngine, Error> {
    let limiter = shared_limiter(config.max_concurrent_requests);
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    if let Some(key) = config.assemblyai_api_key() {
        let provider_config = assemblyai_config()
            .with_base_url(config.assemblyai_base_url())
            .with_max_upload_bytes(config.assemblyai_max_upload_bytes);
        providers.push(Arc::new(AssemblyAiClient::new(
            SecretString::new(key),
            provider_config,
            limiter.clone(),
            config.http_timeout(),
        )?));
    }

    if let Some(key) = config.openai_api_key() {
        let provider_config = openai_config()
            .with_base_url(config.openai_base_url())
            .with_max_upload_bytes(config.openai_max_upload_bytes);
        providers.push(Arc::new(OpenAiWhisperClient::new(
            SecretString::new(key),
            provider_config,
            config.openai_model(),
            limiter.clone(),
            config.http_timeout(),
        )?));
    }

    let default_index = providers
        .iter()
        .position(|p| p.provider_id() == config.default_provider())
        .ok_or_else(|| Error::missing_default_provider(config.default_provider()))?;
    let default = providers.swap_remove(default_index);

    let engine = providers
        .into_iter()
        .fold(
            TranscriptionEngine::new(default, config.polling_policy()),
            |engine, provider| engine.with_provider(provider),
        );

    info!(
        "Transcription engine ready: default provider {}, available {:?}",
        engine.default_provider_id(),
        engine.provider_ids().collect::<Vec<_>>()
    );
    Ok(engine)
}
