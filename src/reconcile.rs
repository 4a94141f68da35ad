//! Reconciliation of fetched records into vault files.
//!
//! Each record maps to one note:
//!
//! ```text
//! <source path>/<SubFolder>/<sanitized Title>.<Extension or md>
//! ```
//!
//! | State of the note path | Action |
//! |------------------------|--------|
//! | missing | `create` with the `MD` column as content |
//! | exists, path starts with `.` | direct `write` (config-dir file) |
//! | exists otherwise | `modify` the file, then wait the settle delay |
//!
//! Records are processed one at a time, in batches that only control how
//! often a progress notice is emitted. A failing record is reported and
//! skipped; it never stops the rest of the batch.

use serde::Serialize;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::error::FetchError;
use crate::models::RawRecord;
use crate::notice::{Notice, NoticeSink};
use crate::vault::{join_path, normalize_path, FileStore};

/// Characters that may not appear in a note's file name.
const FORBIDDEN_FILE_NAME_CHARS: &[char] = &[
    '/', '\\', '|', ':', '\'', '"', '(', ')', '（', '）', '{', '}', '<', '>', '.', '*',
];

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Records per progress notice.
    pub batch_size: usize,
    /// Pause after each `modify` so the host's file index can catch up.
    pub settle_delay: Duration,
    /// Extension used when a record has no `Extension` column.
    pub default_extension: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl ReconcileOptions {
    pub fn from_config(sync: &SyncConfig) -> Self {
        Self {
            batch_size: sync.batch_size.max(1),
            settle_delay: sync.settle_delay(),
            default_extension: sync.default_extension.clone(),
        }
    }
}

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub modified: usize,
    /// Config-dir files written directly.
    pub overwritten: usize,
    /// Existing paths with no file handle (e.g. a folder of the same name).
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created + self.modified + self.overwritten + self.skipped
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.created += other.created;
        self.modified += other.modified;
        self.overwritten += other.overwritten;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Replace characters that are unsafe in file names with `-` and trim.
pub fn sanitize_file_name(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if FORBIDDEN_FILE_NAME_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Folder and note path for a record, both vault-relative.
pub fn note_location(
    root_path: &str,
    record: &RawRecord,
    default_extension: &str,
) -> (String, String) {
    let note = record.note();
    let folder = match note.sub_folder() {
        Some(sub) => normalize_path(&format!("{}/{}", root_path, sub)),
        None => normalize_path(root_path),
    };
    let name = sanitize_file_name(&note.title().unwrap_or_default());
    let extension = note
        .extension()
        .unwrap_or_else(|| default_extension.to_string());
    let path = join_path(&folder, &format!("{}.{}", name, extension));
    (folder, path)
}

/// Create or update one note per record under `root_path`.
pub async fn reconcile(
    store: &dyn FileStore,
    records: &[RawRecord],
    root_path: &str,
    options: &ReconcileOptions,
    notices: &dyn NoticeSink,
) -> SyncReport {
    notices.notify(Notice::ToProcess {
        total: records.len(),
    });

    let mut report = SyncReport::default();
    let mut remaining = records.len();

    for batch in records.chunks(options.batch_size.max(1)) {
        for record in batch {
            if let Err(e) = reconcile_one(store, record, root_path, options, &mut report).await {
                tracing::warn!(error = %e, "record not synced");
                notices.notify(Notice::Failure(e));
                report.failed += 1;
            }
        }

        remaining -= batch.len();
        if remaining > 0 {
            notices.notify(Notice::Remaining { remaining });
        }
    }

    notices.notify(Notice::Finished);
    tracing::info!(?report, "reconcile finished");
    report
}

async fn reconcile_one(
    store: &dyn FileStore,
    record: &RawRecord,
    root_path: &str,
    options: &ReconcileOptions,
    report: &mut SyncReport,
) -> Result<(), FetchError> {
    let write_err = |e: anyhow::Error| FetchError::Write(format!("{:#}", e));

    let (folder, path) = note_location(root_path, record, &options.default_extension);
    if !folder.is_empty() && !store.exists(&folder).await.map_err(write_err)? {
        store.create_folder(&folder).await.map_err(write_err)?;
    }

    let content = record.note().body().unwrap_or_default();

    if !store.exists(&path).await.map_err(write_err)? {
        store.create(&path, &content).await.map_err(write_err)?;
        tracing::debug!(path = %path, "created");
        report.created += 1;
    } else if path.starts_with('.') {
        report.overwritten += 1;
        store.write(&path, &content).await.map_err(write_err)?;
        tracing::debug!(path = %path, "overwrote config-dir file");
    } else {
        match store.file(&path).await.map_err(write_err)? {
            Some(file) => {
                store.modify(&file, &content).await.map_err(write_err)?;
                tracing::debug!(path = %path, "modified");
                report.modified += 1;
                if !options.settle_delay.is_zero() {
                    tokio::time::sleep(options.settle_delay).await;
                }
            }
            None => {
                tracing::debug!(path = %path, "exists but is not a file; skipped");
                report.skipped += 1;
            }
        }
    }

    Ok(())
}
