//! User-facing notices.
//!
//! Everything the user should see during a fetch (counts, completion,
//! failures) goes through a [`NoticeSink`]. Notices are emitted on
//! **stderr** so stdout stays parseable for the final summary.
//!
//! Diagnostics that are only useful when debugging go through `tracing`
//! instead.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use crate::error::FetchError;

/// A single notice raised by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Number of records about to be reconciled.
    ToProcess { total: usize },
    /// Records still queued after a batch.
    Remaining { remaining: usize },
    /// The reconcile queue is empty.
    Finished,
    /// A whole source finished.
    SourceFetched { source: String },
    /// Something failed; the run carries on.
    Failure(FetchError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::ToProcess { total } => write!(
                f,
                "There are {} files needed to be updated or created.",
                total
            ),
            Notice::Remaining { remaining } => {
                write!(f, "There are {} files needed to be processed.", remaining)
            }
            Notice::Finished => write!(f, "All Finished."),
            Notice::SourceFetched { source } => write!(f, "{} fetched successfully", source),
            Notice::Failure(err) => write!(f, "{}", err),
        }
    }
}

/// Receives notices. Implementations decide where they end up.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// One human-readable line per notice on stderr.
pub struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn notify(&self, notice: Notice) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", notice);
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonNotices;

impl NoticeSink for JsonNotices {
    fn notify(&self, notice: Notice) {
        let obj = match &notice {
            Notice::ToProcess { total } => serde_json::json!({
                "event": "to_process",
                "total": total
            }),
            Notice::Remaining { remaining } => serde_json::json!({
                "event": "remaining",
                "remaining": remaining
            }),
            Notice::Finished => serde_json::json!({ "event": "finished" }),
            Notice::SourceFetched { source } => serde_json::json!({
                "event": "source_fetched",
                "source": source
            }),
            Notice::Failure(err) => serde_json::json!({
                "event": "failure",
                "kind": err.kind(),
                "message": err.to_string()
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

/// Drops progress. Failures still go to stderr, one line each.
pub struct FailuresOnly;

impl NoticeSink for FailuresOnly {
    fn notify(&self, notice: Notice) {
        if let Notice::Failure(_) = notice {
            StderrNotices.notify(notice);
        }
    }
}

/// Keeps every notice in memory, in order.
#[derive(Default)]
pub struct CollectedNotices {
    notices: Mutex<Vec<Notice>>,
}

impl CollectedNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<FetchError> {
        self.snapshot()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Failure(err) => Some(err),
                _ => None,
            })
            .collect()
    }
}

impl NoticeSink for CollectedNotices {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

/// Notice mode for the CLI: off, human (stderr), or JSON (stderr).
///
/// `Off` only silences progress; failures are always reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeMode {
    Off,
    Human,
    Json,
}

impl NoticeMode {
    /// Human notices when stderr is a TTY, otherwise failures only.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NoticeMode::Human
        } else {
            NoticeMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(NoticeMode::Off),
            "human" => Some(NoticeMode::Human),
            "json" => Some(NoticeMode::Json),
            _ => None,
        }
    }

    pub fn sink(&self) -> Box<dyn NoticeSink> {
        match self {
            NoticeMode::Off => Box::new(FailuresOnly),
            NoticeMode::Human => Box::new(StderrNotices),
            NoticeMode::Json => Box::new(JsonNotices),
        }
    }
}
