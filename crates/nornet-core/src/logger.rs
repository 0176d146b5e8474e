//! Run logger
//!
//! Every message goes to the process log through `tracing`. When a job sink
//! is attached, messages are also recorded there; debug messages only when
//! the run is in verbose-debug mode.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use nornet_api::{DEFAULT_GROUPING, JobLogEntry, Severity};
use tracing::{debug, error, info, warn};

/// Backend recording job-log entries for an audit trail
pub trait JobSink: Send + Sync {
    /// Record one entry
    fn record(&self, entry: &JobLogEntry);
}

/// Sink keeping entries in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<JobLogEntry>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries
    #[must_use]
    pub fn entries(&self) -> Vec<JobLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl JobSink for MemorySink {
    fn record(&self, entry: &JobLogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Sink appending entries to a file as JSON lines
#[derive(Debug)]
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) the file for appending
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl JobSink for JsonLinesSink {
    fn record(&self, entry: &JobLogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize job log entry");
                return;
            }
        };

        let Ok(mut file) = self.file.lock() else {
            warn!("job log file lock poisoned, entry dropped");
            return;
        };
        if let Err(e) = writeln!(file, "{line}") {
            warn!(error = %e, "failed to write job log entry");
        }
    }
}

/// Logger shared by the inventory builder, dispatcher and drivers
#[derive(Clone)]
pub struct RunLogger {
    name: String,
    sink: Option<Arc<dyn JobSink>>,
    debug: bool,
}

impl RunLogger {
    /// Create a logger that only writes to the process log
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink: None,
            debug: false,
        }
    }

    /// Attach a job sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn JobSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Forward debug messages to the job sink
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Logger name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether debug messages reach the job sink
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Log a debug message; no subject
    pub fn debug(&self, message: &str, grouping: Option<&str>) {
        let grouping = grouping.unwrap_or(DEFAULT_GROUPING);
        debug!(logger = %self.name, grouping, "{message}");
        if self.debug {
            self.record(Severity::Debug, grouping, None, message);
        }
    }

    /// Log an informational message about a subject
    pub fn info(&self, subject: &dyn fmt::Display, message: &str, grouping: Option<&str>) {
        let grouping = grouping.unwrap_or(DEFAULT_GROUPING);
        info!(logger = %self.name, grouping, "{subject} | {message}");
        self.record(Severity::Info, grouping, Some(subject), message);
    }

    /// Log a success about a subject
    pub fn success(&self, subject: &dyn fmt::Display, message: &str, grouping: Option<&str>) {
        let grouping = grouping.unwrap_or(DEFAULT_GROUPING);
        info!(logger = %self.name, grouping, "{subject} | {message}");
        self.record(Severity::Success, grouping, Some(subject), message);
    }

    /// Log a warning about a subject
    pub fn warning(&self, subject: &dyn fmt::Display, message: &str, grouping: Option<&str>) {
        let grouping = grouping.unwrap_or(DEFAULT_GROUPING);
        warn!(logger = %self.name, grouping, "{subject} | {message}");
        self.record(Severity::Warning, grouping, Some(subject), message);
    }

    /// Log a failure about a subject
    pub fn failure(&self, subject: &dyn fmt::Display, message: &str, grouping: Option<&str>) {
        let grouping = grouping.unwrap_or(DEFAULT_GROUPING);
        error!(logger = %self.name, grouping, "{subject} | {message}");
        self.record(Severity::Failure, grouping, Some(subject), message);
    }

    fn record(
        &self,
        severity: Severity,
        grouping: &str,
        subject: Option<&dyn fmt::Display>,
        message: &str,
    ) {
        if let Some(sink) = &self.sink {
            let entry = JobLogEntry::new(
                severity,
                grouping,
                subject.map(ToString::to_string),
                message,
            );
            sink.record(&entry);
        }
    }
}

impl fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogger")
            .field("name", &self.name)
            .field("sink", &self.sink.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}
