//! Terminal logging for the CLI.
//!
//! Stdout carries the JSON result, so every log line goes to stderr.

use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// HTTP stack crates that flood the log at debug level.
const NOISY_MODULES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2", "mio"];

/// What the logger will be installed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub ignored_modules: Vec<&'static str>,
}

impl LogSettings {
    /// The HTTP stack stays quiet unless the level is `Trace`.
    pub fn for_level(level: LevelFilter) -> Self {
        let ignored_modules = match level {
            LevelFilter::Trace => Vec::new(),
            _ => NOISY_MODULES.to_vec(),
        };
        Self {
            level,
            ignored_modules,
        }
    }

    pub fn ignores(&self, module: &str) -> bool {
        self.ignored_modules
            .iter()
            .any(|ignored| module == *ignored || module.starts_with(&format!("{ignored}::")))
    }

    fn build(&self) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        for module in &self.ignored_modules {
            builder.add_filter_ignore_str(module);
        }
        builder.build()
    }
}

pub struct Logger {}

impl Logger {
    /// Install the global stderr logger. Fails if a logger is already installed.
    pub fn init_logger(config: &Config) -> Result<(), log::SetLoggerError> {
        let settings = LogSettings::for_level(config.log_level_filter);
        TermLogger::init(
            settings.level,
            settings.build(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_trace_shows_the_http_stack() {
        let settings = LogSettings::for_level(LevelFilter::Trace);
        assert!(settings.ignored_modules.is_empty());
        assert!(!settings.ignores("reqwest::connect"));
    }

    #[test]
    fn test_info_hides_the_http_stack() {
        let settings = LogSettings::for_level(LevelFilter::Info);
        assert!(settings.ignores("reqwest"));
        assert!(settings.ignores("hyper::proto::h1"));
        assert!(settings.ignores("hyper_util::client"));
        assert!(!settings.ignores("domain::gateway::assembly_ai"));
        assert!(!settings.ignores("transcription::poller"));
    }

    #[test]
    fn test_debug_keeps_our_crates_visible() {
        let settings = LogSettings::for_level(LevelFilter::Debug);
        assert_eq!(settings.level, LevelFilter::Debug);
        assert!(!settings.ignores("provider_auth::http::client"));
        assert!(settings.ignores("rustls"));
    }

    #[test]
    fn test_settings_follow_configured_level() {
        let config = Config::parse_from(["audiototext", "--log-level-filter", "TRACE"]);
        let settings = LogSettings::for_level(config.log_level_filter);
        assert_eq!(settings.level, LevelFilter::Trace);
        assert!(settings.ignored_modules.is_empty());
    }
}
