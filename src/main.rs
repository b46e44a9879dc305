use std::process::ExitCode;

use clap::Parser;
use dotenvy::dotenv;
use log::*;
use service::logging::Logger;
use transcription::TranscriptionEngine;

mod cli;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file first so flags can fall back to it
    dotenv().ok();
    let cli = Cli::parse();
    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
    }
    debug!("Running in {} mode", cli.config.runtime_env());

    let engine = match domain::build_engine(&cli.config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to configure transcription providers: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.verify_credentials {
        return verify_credentials(&engine, cli.provider.as_deref()).await;
    }

    let request = match cli.submit_request().await {
        Ok(request) => request,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let audio_url = request.source().public_url().map(|url| url.to_string());
    let job = engine.spawn(request, cli.provider.clone());
    let cancel = job.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling transcription");
            cancel.cancel();
        }
    });

    match job.wait().await {
        Ok(result) => {
            let body = output::response(&result, audio_url.as_deref());
            match serde_json::to_string_pretty(&body) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Failed to serialize transcription result: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            error!("Transcription failed: {e}");
            if let Some(job) = &e.job {
                info!(
                    "Last known state of {} job {}: {:?}",
                    job.provider_id, job.external_job_id, job.status
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn verify_credentials(
    engine: &TranscriptionEngine,
    provider_id: Option<&str>,
) -> ExitCode {
    let provider = match engine.provider(provider_id) {
        Ok(provider) => provider,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match provider.verify_credentials().await {
        Ok(true) => {
            info!("{} accepted the configured API key", provider.provider_id());
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!("{} rejected the configured API key", provider.provider_id());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Could not verify credentials: {e}");
            ExitCode::FAILURE
        }
    }
}
