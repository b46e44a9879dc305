use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use transcription::PollingPolicy;

/// Default AssemblyAI API base URL used when `ASSEMBLYAI_BASE_URL` is not set.
pub const DEFAULT_ASSEMBLYAI_BASE_URL: &str = "https://api.assemblyai.com/v2";

/// Default OpenAI API base URL used when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Identifiers accepted by `--default-provider` and the CLI's `--provider`.
pub const PROVIDER_IDS: [&str; 2] = ["assemblyai", "openai_whisper"];

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The API key to use when calling the AssemblyAI API.
    #[arg(long, env, hide_env_values = true)]
    assemblyai_api_key: Option<String>,

    /// The base URL of the AssemblyAI API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_ASSEMBLYAI_BASE_URL)]
    assemblyai_base_url: String,

    /// Largest audio upload, in bytes, sent to AssemblyAI.
    #[arg(long, env, default_value_t = 2_200_000_000)]
    pub assemblyai_max_upload_bytes: usize,

    /// The API key to use when calling the OpenAI API.
    #[arg(long, env, hide_env_values = true)]
    openai_api_key: Option<String>,

    /// The base URL of the OpenAI API.
    #[arg(long, env, default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// The OpenAI transcription model.
    #[arg(long, env, default_value = "whisper-1")]
    openai_model: String,

    /// Largest audio upload, in bytes, sent to OpenAI.
    #[arg(long, env, default_value_t = 25 * 1024 * 1024)]
    pub openai_max_upload_bytes: usize,

    /// Provider used when a request does not name one.
    #[arg(long, env, default_value = "assemblyai",
        value_parser = clap::builder::PossibleValuesParser::new(PROVIDER_IDS),
    )]
    default_provider: String,

    /// Delay before the first re-poll of a job, in milliseconds.
    #[arg(long, env, default_value_t = 1000)]
    pub poll_base_delay_ms: u64,

    /// Upper bound for the exponential polling delay, in milliseconds.
    #[arg(long, env, default_value_t = 15_000)]
    pub poll_max_delay_ms: u64,

    /// Wall-clock budget for a single transcription job, in seconds.
    #[arg(long, env, default_value_t = 900)]
    pub job_deadline_secs: u64,

    /// Consecutive transient provider failures tolerated before a job fails.
    #[arg(long, env, default_value_t = 3)]
    pub max_transient_retries: u32,

    /// Maximum number of provider requests in flight across all jobs.
    #[arg(long, env, default_value_t = 16)]
    pub max_concurrent_requests: usize,

    /// Timeout in seconds for a single provider HTTP request.
    #[arg(long, env, default_value_t = 60)]
    pub http_timeout_secs: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap_or(RustEnv::Development)),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the AssemblyAI API key, if configured and not blank.
    pub fn assemblyai_api_key(&self) -> Option<String> {
        self.assemblyai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    /// Returns the AssemblyAI API base URL.
    pub fn assemblyai_base_url(&self) -> &str {
        &self.assemblyai_base_url
    }

    /// Returns the OpenAI API key, if configured and not blank.
    pub fn openai_api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    /// Returns the OpenAI API base URL.
    pub fn openai_base_url(&self) -> &str {
        &self.openai_base_url
    }

    pub fn openai_model(&self) -> &str {
        &self.openai_model
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Polling cadence and retry budget applied to every job.
    pub fn polling_policy(&self) -> PollingPolicy {
        PollingPolicy {
            base_delay: Duration::from_millis(self.poll_base_delay_ms),
            max_delay: Duration::from_millis(self.poll_max_delay_ms.max(self.poll_base_delay_ms)),
            deadline: Duration::from_secs(self.job_deadline_secs),
            max_transient_retries: self.max_transient_retries,
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }
}
