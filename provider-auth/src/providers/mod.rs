//! Pre-defined provider configurations.

mod config;

pub use config::{assemblyai_config, openai_config, ProviderConfig};
