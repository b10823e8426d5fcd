// Logging module - subscriber setup and in-memory diagnostic capture
//
// The bridge reports every ignored message, failed send and skipped hook
// through `tracing`. Hosts usually want those on stderr (and optionally in a
// rotating JSON file); tests and the demo additionally want to read them back,
// which is what `CaptureLayer` + `DiagnosticBuffer` are for.

use crate::config::{LogRotation, LoggingConfig};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Maximum number of diagnostic entries to keep in memory
const MAX_DIAGNOSTIC_ENTRIES: usize = 1000;

/// A single event captured from tracing
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub target: String,
    pub message: String,
    /// Structured fields other than `message`, in recording order
    pub fields: Vec<(String, String)>,
}

impl DiagnosticEntry {
    /// Value of a structured field, if it was recorded
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// Bounded in-memory diagnostic buffer (ring buffer)
#[derive(Clone)]
pub struct DiagnosticBuffer {
    entries: Arc<Mutex<VecDeque<DiagnosticEntry>>>,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_DIAGNOSTIC_ENTRIES))),
        }
    }

    // A panic while holding the lock cannot leave the deque half-updated
    fn lock(&self) -> MutexGuard<'_, VecDeque<DiagnosticEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an entry, evicting the oldest one when full
    pub fn add(&self, entry: DiagnosticEntry) {
        let mut entries = self.lock();
        if entries.len() >= MAX_DIAGNOSTIC_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All entries, most recent last
    pub fn get_all(&self) -> Vec<DiagnosticEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Entries at `level` or more severe
    pub fn at_least(&self, level: LogLevel) -> Vec<DiagnosticEntry> {
        // Error < Warn < ... in declaration order
        self.lock()
            .iter()
            .filter(|entry| (entry.level as u8) <= (level as u8))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for DiagnosticBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiagnosticBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticBuffer")
            .field("len", &self.len())
            .finish()
    }
}

/// Tracing layer that copies events into a [`DiagnosticBuffer`]
pub struct CaptureLayer {
    buffer: DiagnosticBuffer,
}

impl CaptureLayer {
    pub fn new(buffer: DiagnosticBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        self.buffer.add(DiagnosticEntry {
            timestamp: Utc::now(),
            level: LogLevel::from(metadata.level()),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }

    fn enabled(&self, _metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Filtering happens at subscriber level
        true
    }
}

/// Collects the message and the remaining fields of an event
#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl EntryVisitor {
    fn push(&mut self, field: &tracing::field::Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl tracing::field::Visit for EntryVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber setup
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global subscriber
///
/// Precedence for the stderr and file filters: `RUST_LOG` > config file >
/// "info". The capture buffer, when given, always records this crate's debug
/// events so rejected messages can be inspected after the fact. With file
/// logging enabled, the returned guard must be kept alive until exit so the
/// background writer flushes.
pub fn init(
    config: &LoggingConfig,
    capture: Option<DiagnosticBuffer>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter(config)),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    let capture_layer = capture.map(|buffer| {
        CaptureLayer::new(buffer).with_filter(Targets::new().with_target("hostbridge", Level::DEBUG))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(config)),
        )
        .with(file_layer)
        .with(capture_layer)
        .try_init()?;

    Ok(guard)
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let default_filter = format!("hostbridge={}", config.level);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Non-blocking rolling file writer, if file logging is enabled and possible
fn file_writer(
    config: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let file = config.file.as_ref()?;

    if let Err(e) = std::fs::create_dir_all(&file.dir) {
        // Subscriber is not up yet; fall back to stderr-only logging
        eprintln!("Warning: Could not create log directory {:?}: {}", file.dir, e);
        return None;
    }

    let appender = match file.rotation {
        LogRotation::Hourly => tracing_appender::rolling::hourly(&file.dir, &file.prefix),
        LogRotation::Daily => tracing_appender::rolling::daily(&file.dir, &file.prefix),
        LogRotation::Never => tracing_appender::rolling::never(&file.dir, &file.prefix),
    };

    Some(tracing_appender::non_blocking(appender))
}
