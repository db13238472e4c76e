//! Integration tests for logging system
//!
//! The global subscriber can only be installed once per process, so the
//! whole initialization sequence lives in a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_init_logging_once_and_mirror_to_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialization succeeds");

    tracing::debug!(target: "core_session", state = "Playing", "playback state projected");
    tracing::trace!(target: "core_session", "below sink threshold");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "playback state projected");
        assert_eq!(entries[0].fields.get("state"), Some(&"Playing".to_string()));
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::LoggingInstalled(_))));
}

#[test]
fn test_invalid_custom_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_session=loud");
    let result = init_logging(config);
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("filter")));
}
