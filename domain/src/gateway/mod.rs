//! HTTP gateways to third-party speech-to-text providers.
//!
//! Each gateway implements `transcription::Provider`. The helpers here translate
//! HTTP outcomes into transcription error kinds so that every gateway classifies
//! failures the same way.

pub mod assembly_ai;
pub mod openai_whisper;

use log::*;
use provider_auth::http::{is_transient_status, parse_retry_after, LimitedResponse};
use serde::de::DeserializeOwned;
use transcription::Error;

/// Map a failure to send a request.
pub(crate) fn transport_error(provider: &str, err: provider_auth::Error) -> Error {
    warn!("{} request failed: {}", provider, err);
    if err.is_transient() {
        Error::unavailable(format!("{} could not be reached", provider), None).with_source(err)
    } else {
        Error::rejected(format!("{} request could not be sent", provider)).with_source(err)
    }
}

/// Pass successful responses through; classify the rest as transient or permanent.
///
/// The response body is logged at debug level only and never copied into the error.
pub(crate) async fn check_status(
    provider: &str,
    response: LimitedResponse,
) -> Result<LimitedResponse, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    debug!("{} returned {}: {}", provider, status, body);

    if is_transient_status(status) {
        warn!("{} is unavailable ({})", provider, status);
        Err(Error::unavailable(
            format!("{} responded with {}", provider, status),
            retry_after,
        ))
    } else {
        error!("{} rejected the request ({})", provider, status);
        Err(Error::rejected(format!(
            "{} rejected the request with {}",
            provider, status
        )))
    }
}

/// Read and decode a JSON body. A body that does not match the expected shape is
/// a contract violation by the provider.
pub(crate) async fn decode<T: DeserializeOwned>(
    provider: &str,
    response: LimitedResponse,
) -> Result<T, Error> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;

    serde_json::from_str(&body).map_err(|e| {
        debug!("Undecodable {} response: {}", provider, body);
        Error::reconciliation(
            format!("{} returned an unexpected response shape", provider),
            e.to_string(),
        )
    })
}
