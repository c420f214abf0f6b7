//! Archive relocation for uploaded files.
//!
//! Collision policy: when the archive already holds a file with the same name, the
//! **source file is deleted** and the archived copy is left untouched. A same-named
//! archived file is taken as proof that this file was already sent. This never overwrites
//! the archive, but it does silently discard the source copy, even if its content differs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ArchiveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Source now lives at this path.
    Moved(PathBuf),
    /// A file already existed at this path; the source was deleted instead.
    DuplicateDiscarded(PathBuf),
}

/// Move `file` into `archive_dir`, creating the directory if needed.
///
/// On error the source is left where it was.
pub fn archive(file: &Path, archive_dir: &Path) -> Result<ArchiveOutcome, ArchiveError> {
    let name = file.file_name().ok_or_else(|| ArchiveError::InvalidSource(file.to_path_buf()))?;
    fs::create_dir_all(archive_dir)
        .map_err(|e| ArchiveError::CreateDir(archive_dir.to_path_buf(), e.to_string()))?;

    let dest = archive_dir.join(name);
    if dest.exists() {
        fs::remove_file(file)
            .map_err(|e| ArchiveError::RemoveDuplicate(file.to_path_buf(), e.to_string()))?;
        tracing::warn!(
            "[archive] {} already archived, deleted source copy {}",
            dest.display(),
            file.display()
        );
        return Ok(ArchiveOutcome::DuplicateDiscarded(dest));
    }

    move_file(file, &dest)
        .map_err(|e| ArchiveError::Move(file.to_path_buf(), dest.clone(), e.to_string()))?;
    Ok(ArchiveOutcome::Moved(dest))
}

// Prefer rename; fall back to copy + remove when the archive is on another filesystem.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!("[archive] rename across devices ({}), copying instead", e);
            if let Err(copy_err) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(copy_err);
            }
            if let Err(rm_err) = fs::remove_file(from) {
                // keep the source authoritative so the next cycle retries cleanly
                let _ = fs::remove_file(to);
                return Err(rm_err);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}
