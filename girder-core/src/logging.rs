//! Logging setup for Girder applications.
//!
//! Girder logs through `tracing` macros (re-exported here). [`LogConfig`]
//! installs a `tracing-subscriber` registry with an `EnvFilter`, one of four
//! output formats, and a non-blocking writer from `tracing-appender`.
//! Defaults to JSON on STDOUT at INFO.
//!
//! ```no_run
//! use girder_core::logging::*;
//!
//! # fn main() -> girder_core::Result<()> {
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init()?;
//!
//! info!("Logging initialized");
//! # Ok(())
//! # }
//! ```
//!
//! The returned guard flushes buffered lines when dropped; keep it alive
//! for the lifetime of the program.
//!
//! Configuration keys read by [`LogConfig::from_configuration`]:
//!
//! | key | values |
//! |-----|--------|
//! | `log.level` | `trace`, `debug`, `info`, `warn`, `error` |
//! | `log.format` | `json`, `plain`, `pretty`, `compact` |
//! | `log.output` | `stdout`, `stderr`, `file`, `rolling` |
//! | `log.file` | path, for `file` output |
//! | `log.directory`, `log.prefix`, `log.rotation` | for `rolling` output |
//! | `log.filter` | `EnvFilter` directives, overriding `log.level` |

use crate::settings::Configuration;
use crate::{Error, Result};
use std::io;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::{self, MakeWriter, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub use tracing::{debug, error, info, trace, warn};
pub use tracing_appender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(Error::Configuration(format!("unknown log level '{}'", other))),
        }
    }
}

/// Line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, one JSON object per line
    Json,
    Plain,
    /// Multi-line, for development
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "plain" | "text" => Ok(LogFormat::Plain),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(Error::Configuration(format!("unknown log format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Append to a single file
    File(String),
    RollingFile {
        directory: String,
        prefix: String,
        rotation: Rotation,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    fn to_tracing_rotation(self) -> tracing_appender::rolling::Rotation {
        match self {
            Rotation::Minutely => tracing_appender::rolling::Rotation::MINUTELY,
            Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
            Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
        }
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutely" => Ok(Rotation::Minutely),
            "hourly" => Ok(Rotation::Hourly),
            "daily" => Ok(Rotation::Daily),
            "never" => Ok(Rotation::Never),
            other => Err(Error::Configuration(format!("unknown log rotation '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub thread_ids: bool,
    pub targets: bool,
    pub file_line: bool,
    /// Log span close events and, for JSON, the span list
    pub spans: bool,
    pub colors: bool,
    /// `EnvFilter` directives; overrides `level` when set
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            thread_ids: false,
            targets: true,
            file_line: false,
            spans: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `log.*` configuration keys; missing keys keep defaults.
    pub fn from_configuration(config: &dyn Configuration) -> Result<Self> {
        let mut log = Self::default();

        if let Some(level) = config.get_str("log.level") {
            log.level = level.parse()?;
        }
        if let Some(format) = config.get_str("log.format") {
            log.format = format.parse()?;
        }
        if let Some(filter) = config.get_str("log.filter") {
            log.env_filter = Some(filter);
        }
        if let Some(spans) = config.get_bool("log.spans")? {
            log.spans = spans;
        }

        log.output = match config.get_str("log.output").as_deref().map(str::trim) {
            None | Some("stdout") => LogOutput::Stdout,
            Some("stderr") => LogOutput::Stderr,
            Some("file") => LogOutput::File(config.get_str("log.file").ok_or_else(|| {
                Error::Configuration("'log.file' is required for file output".to_string())
            })?),
            Some("rolling") => LogOutput::RollingFile {
                directory: config
                    .get_str("log.directory")
                    .unwrap_or_else(|| "logs".to_string()),
                prefix: config
                    .get_str("log.prefix")
                    .unwrap_or_else(|| "girder".to_string()),
                rotation: match config.get_str("log.rotation") {
                    Some(rotation) => rotation.parse()?,
                    None => Rotation::Daily,
                },
            },
            Some(other) => {
                return Err(Error::Configuration(format!("unknown log output '{}'", other)));
            }
        };

        Ok(log)
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.spans = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// e.g. `"girder_core=debug,my_app=trace"`
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Install the global subscriber.
    ///
    /// Fails when the filter or output cannot be set up, or when a global
    /// subscriber is already installed.
    pub fn init(self) -> Result<WorkerGuard> {
        let filter = self.filter()?;

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            LogOutput::RollingFile {
                directory,
                prefix,
                rotation,
            } => {
                let appender = RollingFileAppender::builder()
                    .rotation(rotation.to_tracing_rotation())
                    .filename_prefix(prefix)
                    .build(directory)
                    .map_err(|e| Error::Configuration(format!("cannot open log directory: {}", e)))?;
                tracing_appender::non_blocking(appender)
            }
        };

        tracing_subscriber::registry()
            .with(self.layer(writer).with_filter(filter))
            .try_init()
            .map_err(|e| Error::Configuration(format!("logging already initialized: {}", e)))?;

        Ok(guard)
    }

    fn filter(&self) -> Result<EnvFilter> {
        match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .map_err(|e| Error::Configuration(format!("invalid log filter: {}", e))),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))),
        }
    }

    fn layer<W>(&self, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let span_events = if self.spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_writer(writer)
            .with_target(self.targets)
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_line)
            .with_line_number(self.file_line)
            .with_span_events(span_events);

        match self.format {
            LogFormat::Json => base
                .json()
                .with_current_span(self.spans)
                .with_span_list(self.spans)
                .boxed(),
            LogFormat::Plain => base.with_ansi(self.colors).boxed(),
            LogFormat::Pretty => base.pretty().with_ansi(self.colors).boxed(),
            LogFormat::Compact => base
                .compact()
                .with_ansi(self.colors)
                .with_file(false)
                .with_line_number(false)
                .boxed(),
        }
    }
}
