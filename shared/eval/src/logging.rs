use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    Json,
}

impl FromStr for LogOutput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(LogOutput::Console),
            "json" => Ok(LogOutput::Json),
            _ => bail!("Unknown log output {s}"),
        }
    }
}

pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

pub struct LoggingBuilder {
    output: LogOutput,
    level: Level,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self {
            output: LogOutput::Console,
            level: Level::INFO,
        }
    }

    /// Set the log output format
    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    /// Set the log level. `RUST_LOG` still takes precedence.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Build the subscriber without installing it.
    pub fn build(self) -> Result<BoxedSubscriber> {
        let filter = EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env()?;

        let subscriber = tracing_subscriber::registry();
        let subscriber: BoxedSubscriber = match self.output {
            LogOutput::Console => Box::new(
                subscriber.with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_filter(filter),
                ),
            ),
            LogOutput::Json => Box::new(
                subscriber.with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .flatten_event(true)
                        .with_current_span(true)
                        .with_filter(filter),
                ),
            ),
        };
        Ok(subscriber)
    }

    /// Install as the process-wide default subscriber.
    pub fn init(self) -> Result<()> {
        tracing::subscriber::set_global_default(self.build()?)?;
        Ok(())
    }
}

/// Create a new logging builder
pub fn logging() -> LoggingBuilder {
    LoggingBuilder::new()
}
