//! Output configuration and mode management

use console::Term;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive operation - display to stdout, logs to stderr
    Cli,
    /// Machine-readable report on stdout - display and logs to stderr
    Report,
}

/// Configuration for the output system
#[derive(Debug)]
pub struct OutputConfig {
    mode: OutputMode,
    color_enabled: bool,
    log_level: Level,
}

impl OutputConfig {
    pub fn new(mode: OutputMode) -> Self {
        let color_enabled = match mode {
            OutputMode::Cli => Term::stdout().features().colors_supported(),
            OutputMode::Report => false,
        };

        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| parse_level(&level))
            .unwrap_or(match mode {
                OutputMode::Cli => Level::INFO,
                OutputMode::Report => Level::WARN,
            });

        Self {
            mode,
            color_enabled,
            log_level,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_enabled
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    /// Set verbose mode (DEBUG level)
    pub fn set_verbose(&mut self) {
        self.log_level = Level::DEBUG;
    }

    /// Initialize the tracing subscriber; logs always go to stderr
    pub fn init_tracing(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(self.log_level.into()))
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr);

        let _ = match self.mode {
            OutputMode::Cli => builder.with_ansi(self.color_enabled).try_init(),
            OutputMode::Report => builder
                .with_ansi(false)
                .without_time()
                .compact()
                .try_init(),
        };
    }
}

fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_mode_disables_color() {
        let config = OutputConfig::new(OutputMode::Report);
        assert!(!config.colors_enabled());
        assert_eq!(config.mode(), OutputMode::Report);
    }

    #[test]
    fn test_verbose_sets_debug() {
        let mut config = OutputConfig::new(OutputMode::Cli);
        config.set_verbose();
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("synapse_scenarios=trace"), None);
    }
}
