//! Command line arguments and request construction.

use std::path::{Path, PathBuf};

use clap::Parser;
use service::config::{Config, PROVIDER_IDS};
use transcription::{AudioBlob, AudioSource, Error, Feature, InputErrorKind, LanguageCode, SubmitRequest};

/// File extensions accepted for uploads, with the content type sent to providers.
pub const ALLOWED_EXTENSIONS: [(&str, &str); 6] = [
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("mp4", "video/mp4"),
    ("webm", "audio/webm"),
    ("flac", "audio/flac"),
];

/// Transcribe one audio URL or local file and print the result as JSON.
#[derive(Debug, Parser)]
#[command(name = "audiototext", author, version, about, long_about = None)]
pub struct Cli {
    /// Public http(s) URL of the audio to transcribe
    #[arg(long, conflicts_with = "file", required_unless_present_any = ["file", "verify_credentials"])]
    pub url: Option<String>,

    /// Local audio file to upload
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Language code of the audio (e.g. hi, ta, en); detected automatically when omitted
    #[arg(long)]
    pub language: Option<String>,

    /// Provider to use instead of the configured default
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(PROVIDER_IDS))]
    pub provider: Option<String>,

    #[arg(long)]
    pub no_speaker_labels: bool,

    #[arg(long)]
    pub no_chapters: bool,

    #[arg(long)]
    pub no_sentiment: bool,

    #[arg(long)]
    pub no_entities: bool,

    /// Only check that the provider accepts the configured API key
    #[arg(long)]
    pub verify_credentials: bool,

    #[command(flatten)]
    pub config: Config,
}

impl Cli {
    pub fn features(&self) -> Vec<Feature> {
        [
            (Feature::SpeakerLabels, self.no_speaker_labels),
            (Feature::Chapters, self.no_chapters),
            (Feature::Sentiment, self.no_sentiment),
            (Feature::Entities, self.no_entities),
        ]
        .into_iter()
        .filter(|(_, disabled)| !disabled)
        .map(|(feature, _)| feature)
        .collect()
    }

    /// Build the request, reading the file from disk when one was given.
    pub async fn submit_request(&self) -> Result<SubmitRequest, Error> {
        let blob = match &self.file {
            Some(path) => Some(read_audio(path).await?),
            None => None,
        };
        let source = AudioSource::from_parts(self.url.as_deref(), blob)?;

        Ok(SubmitRequest::new(source)
            .with_language_hint(self.language.clone().map(LanguageCode::new))
            .with_features(self.features()))
    }
}

/// Content type for an allowed audio file, judged by extension.
pub fn content_type_for(path: &Path) -> Result<&'static str, Error> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, content_type)| *content_type)
        .ok_or_else(|| {
            Error::invalid_input(
                InputErrorKind::UnsupportedSource,
                format!(
                    "unsupported file type '.{}', expected one of: {}",
                    extension,
                    ALLOWED_EXTENSIONS
                        .iter()
                        .map(|(ext, _)| format!(".{ext}"))
                        .collect::<Vec<_>>()
                        .join(" ")
                ),
            )
        })
}

async fn read_audio(path: &Path) -> Result<AudioBlob, Error> {
    let content_type = content_type_for(path)?;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::invalid_input(
            InputErrorKind::MalformedSource,
            format!("could not read {}", path.display()),
        )
        .with_source(e)
    })?;

    Ok(AudioBlob {
        bytes,
        content_type: Some(content_type.to_string()),
        file_name: path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string),
    })
}
