use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::archive::{ArchiveOutcome, archive};
use crate::config::Config;
use crate::transfer::{RemoteConnector, TransferSession};
use crate::util::{human_bytes, write_failures_jsonl};

/// A file captured by a cycle's snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    Moved,
    DuplicateDiscarded,
    Failed { reason: String },
}

impl From<ArchiveOutcome> for ArchiveStatus {
    fn from(o: ArchiveOutcome) -> Self {
        match o {
            ArchiveOutcome::Moved(_) => ArchiveStatus::Moved,
            ArchiveOutcome::DuplicateDiscarded(_) => ArchiveStatus::DuplicateDiscarded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Uploaded { bytes: u64, archive: ArchiveStatus },
    UploadFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleResult {
    pub file: FileRecord,
    pub outcome: Outcome,
}

impl CycleResult {
    pub fn is_uploaded(&self) -> bool {
        matches!(self.outcome, Outcome::Uploaded { .. })
    }

    pub fn archive_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Uploaded { archive: ArchiveStatus::Failed { .. }, .. })
    }
}

/// Everything one cycle did. `aborted` is set when the cycle gave up before trying any
/// file (listing failed, or the session could not be opened).
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub results: Vec<CycleResult>,
    pub elapsed: Duration,
    pub aborted: Option<String>,
}

impl CycleReport {
    pub fn uploaded(&self) -> usize {
        self.results.iter().filter(|r| r.is_uploaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.uploaded()
    }

    pub fn archive_failures(&self) -> usize {
        self.results.iter().filter(|r| r.archive_failed()).count()
    }

    pub fn bytes(&self) -> u64 {
        self.results
            .iter()
            .map(|r| match r.outcome {
                Outcome::Uploaded { bytes, .. } => bytes,
                Outcome::UploadFailed { .. } => 0,
            })
            .sum()
    }

    fn log_summary(&self) {
        let secs = self.elapsed.as_secs_f64();
        match &self.aborted {
            Some(reason) => tracing::error!("[cycle] aborted after {:.2}s: {}", secs, reason),
            None if self.results.is_empty() => {
                tracing::info!("[cycle] nothing to upload ({:.2}s)", secs)
            }
            None => tracing::info!(
                "[cycle] done in {:.2}s: uploaded {} ({}), failed {}, archive failures {}",
                secs,
                self.uploaded(),
                human_bytes(self.bytes()),
                self.failed(),
                self.archive_failures()
            ),
        }
    }
}

/// Flat listing of files in `dir`, ordered by name. Symlinks count when they resolve to a
/// file; sub-directories (including a nested archive directory) and dangling links are
/// ignored.
pub fn snapshot(dir: &Path) -> Result<Vec<FileRecord>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot list {}", dir.display()))?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        files.push(FileRecord { name, path: entry.into_path() });
    }
    Ok(files)
}

/// Run one scan-upload-archive cycle. Never fails: every error is logged and folded into
/// the returned report, and the session is closed on every path.
pub fn run_cycle(config: &Config, connector: &dyn RemoteConnector) -> CycleReport {
    let started = Instant::now();
    let mut report = execute(config, connector);
    report.elapsed = started.elapsed();
    report.log_summary();
    if let Some(path) = &config.failure_log {
        write_failures_jsonl(path, &report.results);
    }
    report
}

fn execute(config: &Config, connector: &dyn RemoteConnector) -> CycleReport {
    let files = match snapshot(&config.watched_directory) {
        Ok(f) => f,
        Err(e) => return CycleReport { aborted: Some(format!("{:#}", e)), ..Default::default() },
    };
    if files.is_empty() {
        return CycleReport::default();
    }
    tracing::info!(
        "[cycle] {} file(s) in {}, uploading to {}",
        files.len(),
        config.watched_directory.display(),
        config.endpoint
    );

    let mut session = match TransferSession::open(
        connector,
        &config.endpoint,
        &config.username,
        &config.password,
    ) {
        Ok(s) => s,
        Err(e) => {
            return CycleReport {
                aborted: Some(format!("{} (skipped {} file(s))", e, files.len())),
                ..Default::default()
            };
        }
    };

    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let outcome = transfer_one(&mut session, &file, &config.archive_directory);
        results.push(CycleResult { file, outcome });
    }

    if let Err(e) = session.close() {
        tracing::warn!("[cycle] {}", e);
    }
    CycleReport { results, ..Default::default() }
}

// Upload, then archive on success. Failures stay local to this file.
fn transfer_one(session: &mut TransferSession<'_>, file: &FileRecord, archive_dir: &Path) -> Outcome {
    let bytes = match session.upload(&file.path) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!("[upload] {} left for next cycle: {}", file.name, e);
            return Outcome::UploadFailed { reason: e.to_string() };
        }
    };
    tracing::info!("[upload] {} sent ({})", file.name, human_bytes(bytes));

    let archive_status = match archive(&file.path, archive_dir) {
        Ok(o) => {
            tracing::debug!("[archive] {} -> {:?}", file.name, o);
            ArchiveStatus::from(o)
        }
        Err(e) => {
            tracing::warn!("[archive] {} uploaded but not archived, will be re-sent: {}", file.name, e);
            ArchiveStatus::Failed { reason: e.to_string() }
        }
    };
    Outcome::Uploaded { bytes, archive: archive_status }
}
