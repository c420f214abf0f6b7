use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cycle::{ArchiveStatus, CycleResult, Outcome};

pub const LOG_FILE_NAME: &str = "replay-sender.log";

/// Install the global subscriber: stdout plus a daily-rolling file in `log_dir`.
/// `RUST_LOG` overrides the default `info` filter. Keep the guard alive for the
/// lifetime of the process or buffered lines are lost.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_target(false).with_writer(non_blocking).with_ansi(false);
    let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
    tracing_subscriber::registry().with(filter).with(file_layer).with(stdout_layer).init();

    guard
}

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// One JSON object per failed upload or failed archive step, for post-mortem reading.
/// Returns `None` for clean outcomes.
pub fn failure_record(result: &CycleResult, ts: &str) -> Option<serde_json::Value> {
    let (stage, message) = match &result.outcome {
        Outcome::UploadFailed { reason } => ("upload", reason),
        Outcome::Uploaded { archive: ArchiveStatus::Failed { reason }, .. } => ("archive", reason),
        Outcome::Uploaded { .. } => return None,
    };
    Some(serde_json::json!({
        "ts": ts,
        "file": result.file.name,
        "path": result.file.path,
        "stage": stage,
        "message": message,
    }))
}

/// Append failures as JSON Lines (append mode, parent directory created on demand).
/// Write errors are logged and otherwise ignored.
pub fn write_failures_jsonl(path: &Path, results: &[CycleResult]) {
    let ts = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let records: Vec<_> = results.iter().filter_map(|r| failure_record(r, &ts)).collect();
    if records.is_empty() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let mut f = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("[report] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    for obj in records {
        if let Err(e) = writeln!(f, "{}", obj) {
            tracing::warn!("[report] cannot write {}: {}", path.display(), e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::FileRecord;
    use std::path::PathBuf;

    fn result(name: &str, outcome: Outcome) -> CycleResult {
        CycleResult {
            file: FileRecord { name: name.to_string(), path: PathBuf::from("/r").join(name) },
            outcome,
        }
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MiB");
    }

    #[test]
    fn only_failures_become_records() {
        let ok = result("a.w3g", Outcome::Uploaded { bytes: 1, archive: ArchiveStatus::Moved });
        assert!(failure_record(&ok, "t").is_none());

        let up = result("b.w3g", Outcome::UploadFailed { reason: "reset".into() });
        let rec = failure_record(&up, "t").unwrap();
        assert_eq!(rec["stage"], "upload");
        assert_eq!(rec["file"], "b.w3g");

        let ar = result(
            "c.w3g",
            Outcome::Uploaded { bytes: 1, archive: ArchiveStatus::Failed { reason: "ro".into() } },
        );
        assert_eq!(failure_record(&ar, "t").unwrap()["stage"], "archive");
    }

    #[test]
    fn jsonl_appends_one_line_per_failure() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("rs_report_{}", nanos));
        let path = dir.join("logs").join("failures.jsonl");
        let results = vec![
            result("a.w3g", Outcome::Uploaded { bytes: 1, archive: ArchiveStatus::Moved }),
            result("b.w3g", Outcome::UploadFailed { reason: "reset".into() }),
        ];
        write_failures_jsonl(&path, &results);
        write_failures_jsonl(&path, &results);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("\"b.w3g\"")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
