use std::path::PathBuf;

/// Startup-fatal configuration errors. Nothing runs when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No file at the configured path.
    Missing(PathBuf),
    /// Present but contains no lines at all.
    Empty(PathBuf),
    Unreadable(PathBuf, String),
    MissingKey(&'static str),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(p) => write!(f, "config file not found: {}", display_path(p)),
            ConfigError::Empty(p) => write!(f, "config file is empty: {}", display_path(p)),
            ConfigError::Unreadable(p, msg) => {
                write!(f, "cannot read config file {}: {}", display_path(p), msg)
            }
            ConfigError::MissingKey(k) => write!(f, "required config key '{}' is missing", k),
            ConfigError::InvalidValue(k, v) => {
                write!(f, "config key '{}' has an invalid value: {}", k, v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub(crate) fn display_path(p: &std::path::Path) -> String {
    let s = p.to_string_lossy().to_string();
    if s.contains('\\') { s.replace('\\', "/") } else { s }
}

/// Errors raised by a [`crate::transfer::TransferSession`].
///
/// Connection and authentication failures surface from opening the session and end the
/// current cycle; transfer failures only affect the file being uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    Connection(String, String),
    Auth(String, String),
    /// (file name, cause)
    Transfer(String, String),
    LocalRead(String, String),
    InvalidState { op: &'static str, state: crate::transfer::SessionState },
    Close(String),
}

impl std::fmt::Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TransferError::*;
        match self {
            Connection(addr, msg) => write!(f, "cannot connect to {}: {}", addr, msg),
            Auth(user, msg) => write!(f, "login rejected for user '{}': {}", user, msg),
            Transfer(name, msg) => write!(f, "upload of {} failed: {}", name, msg),
            LocalRead(name, msg) => write!(f, "cannot read local file {}: {}", name, msg),
            InvalidState { op, state } => {
                write!(f, "session cannot {} while {:?}", op, state)
            }
            Close(msg) => write!(f, "closing session failed: {}", msg),
        }
    }
}

impl std::error::Error for TransferError {}

/// Archive step failures. The uploaded file stays in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    CreateDir(PathBuf, String),
    InvalidSource(PathBuf),
    Move(PathBuf, PathBuf, String),
    RemoveDuplicate(PathBuf, String),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::CreateDir(p, msg) => {
                write!(f, "cannot create archive directory {}: {}", display_path(p), msg)
            }
            ArchiveError::InvalidSource(p) => {
                write!(f, "source has no file name: {}", display_path(p))
            }
            ArchiveError::Move(from, to, msg) => write!(
                f,
                "cannot move {} to {}: {}",
                display_path(from),
                display_path(to),
                msg
            ),
            ArchiveError::RemoveDuplicate(p, msg) => {
                write!(f, "cannot remove already-archived source {}: {}", display_path(p), msg)
            }
        }
    }
}

impl std::error::Error for ArchiveError {}
