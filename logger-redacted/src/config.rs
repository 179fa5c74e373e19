use serde::{Deserialize, Serialize};

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty in development, JSON everywhere else
    Auto,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_format")]
    pub format: LogFormat,

    /// Include file and line in pretty output
    #[serde(default)]
    pub with_location: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Auto
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            with_location: false,
        }
    }
}

impl LoggerConfig {
    /// Pin `Auto` to a concrete format for the given environment
    #[must_use]
    pub fn resolved(mut self, development: bool) -> Self {
        if self.format == LogFormat::Auto {
            self.format = if development { LogFormat::Pretty } else { LogFormat::Json };
        }
        self
    }
}
