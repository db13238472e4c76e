//! # Diagnostics Logging
//!
//! Installs the global `tracing` subscriber for the session engine and
//! optionally mirrors every accepted event into the host's own log pipeline
//! (Logcat, os_log, a desktop log file) through a [`LoggerSink`].
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Compact)
//!         .with_level(LogLevel::Debug)
//!         .with_logger_sink(Arc::new(ConsoleLogger::default())),
//! )?;
//! ```
//!
//! Artwork references are frequently absolute paths on the device. Engine
//! code logs them through [`strip_path`], and with `redact_paths` set the
//! host mirror reduces any `path`, `art_ref` or `*_path` field to its
//! basename as well.

use crate::error::{Error, Result};

use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::format::FmtSpan,
    layer::{Context, Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates whose events pass the default filter at the configured level.
/// Everything else is held to `warn`.
const WORKSPACE_CRATES: &[&str] = &[
    "media_session_workspace",
    "core_runtime",
    "core_metadata",
    "core_session",
    "core_service",
    "bridge_desktop",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One JSON object per line
    Json,
    /// Single line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Options for [`init_logging`].
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Reduce path-like fields to basenames before they reach the sink.
    pub redact_paths: bool,
    /// Full `EnvFilter` directive string; replaces the per-crate default.
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Log span enter/exit (pretty) or attach span context (JSON).
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_paths: true,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_path_redaction(mut self, redact: bool) -> Self {
        self.redact_paths = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }

    fn directives(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }
        let level = level_name(self.level);
        WORKSPACE_CRATES
            .iter()
            .map(|name| format!("{}={}", name, level))
            .chain(std::iter::once("warn".to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Installs the global subscriber.
///
/// # Errors
///
/// `Error::Config` when the filter directives do not parse,
/// `Error::LoggingInstalled` when a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(output_layer(&config))
        .with(HostForwardLayer::new(config.logger_sink.clone(), config.redact_paths))
        .try_init()
        .map_err(|e| Error::LoggingInstalled(e.to_string()))
}

fn output_layer(config: &LoggingConfig) -> Box<dyn Layer<FilteredRegistry> + Send + Sync> {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => base
            .pretty()
            .with_span_events(if config.enable_spans {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

fn from_tracing(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Mirrors events into the host's [`LoggerSink`].
struct HostForwardLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact_paths: bool,
}

impl HostForwardLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>, redact_paths: bool) -> Self {
        Self { sink, redact_paths }
    }

    fn entry_for<S>(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> LogEntry
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let metadata = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(from_tracing(*metadata.level()), metadata.target(), message);
        for (key, value) in fields.values {
            let value = if self.redact_paths && is_path_field(&key) {
                strip_path(&value).to_string()
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }
        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span_id(span.name());
        }
        entry
    }
}

impl<S> Layer<S> for HostForwardLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if from_tracing(*event.metadata().level()) < sink.min_level() {
            return;
        }

        let entry = self.entry_for(event, &ctx);
        let sink = Arc::clone(sink);

        // Never block a runtime worker on host I/O
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.log(entry).await {
                        eprintln!("log sink rejected entry: {}", err);
                    }
                });
            }
            Err(_) => {
                if let Err(err) = futures::executor::block_on(sink.log(entry)) {
                    eprintln!("log sink rejected entry: {}", err);
                }
            }
        }
    }
}

fn is_path_field(name: &str) -> bool {
    name == "path" || name == "art_ref" || name.ends_with("_path")
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}

/// Final component of a Unix or Windows path.
///
/// ```
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/storage/emulated/0/Music/covers/album.jpg"), "album.jpg");
/// assert_eq!(strip_path("https://cdn.example.com/a/b/cover.png"), "cover.png");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as SinkResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    #[async_trait]
    impl LoggerSink for RecordingSink {
        async fn log(&self, entry: LogEntry) -> SinkResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }

        fn min_level(&self) -> LogLevel {
            LogLevel::Debug
        }
    }

    fn capture(redact: bool, emit: impl FnOnce()) -> Vec<LogEntry> {
        let sink = Arc::new(RecordingSink::default());
        let layer = HostForwardLayer::new(Some(sink.clone() as Arc<dyn LoggerSink>), redact);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        let entries = sink.entries.lock().unwrap().clone();
        entries
    }

    #[test]
    fn test_strip_path() {
        assert_eq!(strip_path("/sdcard/Music/covers/album.jpg"), "album.jpg");
        assert_eq!(strip_path("C:\\Users\\sam\\Music\\cover.png"), "cover.png");
        assert_eq!(strip_path("cover.png"), "cover.png");
        assert_eq!(strip_path("/var/cache/"), "");
    }

    #[test]
    fn test_default_directives_cover_workspace() {
        let directives = LoggingConfig::default()
            .with_level(LogLevel::Debug)
            .directives();
        assert!(directives.contains("core_session=debug"));
        assert!(directives.contains("core_metadata=debug"));
        assert!(directives.ends_with(",warn"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }

    #[test]
    fn test_custom_filter_replaces_defaults() {
        let config = LoggingConfig::default().with_filter("core_session=trace");
        assert_eq!(config.directives(), "core_session=trace");
    }

    #[test]
    fn test_forwarded_entry_carries_fields() {
        let entries = capture(false, || {
            tracing::info!(target: "core_session", media_id = "track-1", "notification published");
        });

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "core_session");
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "notification published");
        assert_eq!(entries[0].fields.get("media_id"), Some(&"track-1".to_string()));
    }

    #[test]
    fn test_art_paths_are_redacted() {
        let entries = capture(true, || {
            tracing::warn!(art_ref = "/data/user/0/app/cache/art/42.jpg", "decode failed");
        });
        assert_eq!(entries[0].fields.get("art_ref"), Some(&"42.jpg".to_string()));
    }

    #[test]
    fn test_sink_threshold_applies() {
        let entries = capture(false, || {
            tracing::trace!("frame timing");
            tracing::debug!("art cache miss");
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "art cache miss");
    }
}
