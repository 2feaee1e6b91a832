use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

use super::file_logger::FileLogger;
use crate::endpoint::LoggingSection;

/// Initialize structured logging with tracing.
///
/// Log level can be controlled via RUST_LOG env var.
/// Default level is "info". Output goes to stderr so `exec` keeps stdout for
/// its result. When file logging is enabled, WARN and ERROR events are also
/// appended to the daily JSON log.
pub fn init_logging(config: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = if config.file {
        let logger = FileLogger::global();
        logger.cleanup_old_logs(config.retention_days);
        Some(FileLogLayer::new(logger))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .with(filter)
        .init();
}

/// Mirrors WARN and ERROR events into a [`FileLogger`]
pub struct FileLogLayer {
    logger: &'static FileLogger,
}

impl FileLogLayer {
    pub fn new(logger: &'static FileLogger) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for FileLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.logger
            .write_core_log(meta.level().as_str(), meta.target(), &visitor.finish());
    }
}

/// Collects the `message` field and appends the rest as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_layer_mirrors_only_warn_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let logger: &'static FileLogger = Box::leak(Box::new(FileLogger::new(dir.path().to_path_buf())));
        let subscriber = tracing_subscriber::registry().with(FileLogLayer::new(logger));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("not mirrored");
            tracing::warn!(endpoint = "docs", "push rejected");
            tracing::error!("clone failed");
        });

        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let content = std::fs::read_to_string(dir.path().join(format!("{}.log", today))).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "WARN");
        assert_eq!(lines[0]["msg"], "push rejected endpoint=docs");
        assert_eq!(lines[1]["level"], "ERROR");
        assert_eq!(lines[1]["msg"], "clone failed");
    }
}
