use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;
use crate::parse::{Endpoint, parse_endpoint};

/// Fixed config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.cfg";
/// Periods below this are clamped up.
pub const MIN_CYCLE_PERIOD_SECS: u64 = 5;
/// Archive sub-directory used when `archivepath` is not configured.
pub const DEFAULT_ARCHIVE_DIR_NAME: &str = "sent";

/// Immutable configuration snapshot shared read-only with every cycle.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub watched_directory: PathBuf,
    pub archive_directory: PathBuf,
    pub endpoint: Endpoint,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub cycle_period_secs: u64,
    pub failure_log: Option<PathBuf>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("watched_directory", &self.watched_directory)
            .field("archive_directory", &self.archive_directory)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cycle_period_secs", &self.cycle_period_secs)
            .field("failure_log", &self.failure_log)
            .finish()
    }
}

impl Config {
    /// Read and parse the config file. A missing or line-less file is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(path.to_path_buf(), e.to_string()))?;
        if text.lines().next().is_none() {
            return Err(ConfigError::Empty(path.to_path_buf()));
        }
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let entries = ConfigEntries::new(text);

        let replay_path = entries.get("replaypath").ok_or(ConfigError::MissingKey("replaypath"))?;
        let addr = entries.get("ftpaddr").ok_or(ConfigError::MissingKey("ftpaddr"))?;
        let endpoint = parse_endpoint(addr)
            .map_err(|e| ConfigError::InvalidValue("ftpaddr", format!("{} ({})", addr, e)))?;

        let watched_directory = PathBuf::from(replay_path);
        let archive_directory = match entries.get("archivepath") {
            Some(p) => PathBuf::from(p),
            None => watched_directory.join(DEFAULT_ARCHIVE_DIR_NAME),
        };
        if archive_directory == watched_directory {
            return Err(ConfigError::InvalidValue(
                "archivepath",
                "must differ from replaypath".to_string(),
            ));
        }

        // unparsable means unset; unset means "below minimum"
        let requested = entries.get("parsetimeperiod").and_then(|v| v.parse::<i64>().ok());

        Ok(Config {
            watched_directory,
            archive_directory,
            endpoint,
            username: entries.get("ftpusername").unwrap_or_default().to_string(),
            password: entries.get("ftppassword").unwrap_or_default().to_string(),
            cycle_period_secs: effective_period_secs(requested),
            failure_log: entries.get("failurelog").map(PathBuf::from),
        })
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cycle_period_secs)
    }
}

pub fn effective_period_secs(requested: Option<i64>) -> u64 {
    match requested {
        Some(n) if n > MIN_CYCLE_PERIOD_SECS as i64 => n as u64,
        _ => MIN_CYCLE_PERIOD_SECS,
    }
}

/// `key=value` lines; `#` comments and blank lines skipped, first occurrence wins.
struct ConfigEntries<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> ConfigEntries<'a> {
    fn new(text: &'a str) -> Self {
        let pairs = text
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();
        Self { pairs }
    }

    /// Empty values count as absent.
    fn get(&self, key: &str) -> Option<&'a str> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v).filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# replay uploader
replaypath=/srv/replays
ftpaddr=ftp.example.com:2121
ftpusername=uploader
ftppassword=s3cr=t

parsetimeperiod=30
colour=blue
";

    #[test]
    fn parses_recognised_keys() {
        let c = Config::parse(SAMPLE).unwrap();
        assert_eq!(c.watched_directory, PathBuf::from("/srv/replays"));
        assert_eq!(c.archive_directory, PathBuf::from("/srv/replays").join("sent"));
        assert_eq!(c.endpoint.port, 2121);
        assert_eq!(c.username, "uploader");
        assert_eq!(c.password, "s3cr=t");
        assert_eq!(c.cycle_period(), Duration::from_secs(30));
        assert!(c.failure_log.is_none());
    }

    #[test]
    fn period_below_minimum_is_clamped() {
        let c = Config::parse("replaypath=/r\nftpaddr=h\nparsetimeperiod=2\n").unwrap();
        assert_eq!(c.cycle_period_secs, 5);
        let c = Config::parse("replaypath=/r\nftpaddr=h\nparsetimeperiod=soon\n").unwrap();
        assert_eq!(c.cycle_period_secs, 5);
        let c = Config::parse("replaypath=/r\nftpaddr=h\n").unwrap();
        assert_eq!(c.cycle_period_secs, 5);
        assert_eq!(effective_period_secs(Some(-10)), 5);
    }

    #[test]
    fn first_occurrence_wins_and_comments_skipped() {
        let text = "#replaypath=/nope\nreplaypath=/first\nreplaypath=/second\nftpaddr=h\n";
        let c = Config::parse(text).unwrap();
        assert_eq!(c.watched_directory, PathBuf::from("/first"));
    }

    #[test]
    fn missing_required_keys() {
        assert_eq!(Config::parse("ftpaddr=h\n"), Err(ConfigError::MissingKey("replaypath")));
        assert_eq!(Config::parse("replaypath=/r\nftpaddr=\n"), Err(ConfigError::MissingKey("ftpaddr")));
        assert!(matches!(
            Config::parse("replaypath=/r\nftpaddr=h:x\n"),
            Err(ConfigError::InvalidValue("ftpaddr", _))
        ));
    }

    #[test]
    fn archive_and_failure_log_overrides() {
        let c = Config::parse("replaypath=/r\nftpaddr=h\narchivepath=/a\nfailurelog=logs/f.jsonl\n")
            .unwrap();
        assert_eq!(c.archive_directory, PathBuf::from("/a"));
        assert_eq!(c.failure_log, Some(PathBuf::from("logs/f.jsonl")));
        assert!(Config::parse("replaypath=/r\nftpaddr=h\narchivepath=/r\n").is_err());
    }

    #[test]
    fn password_never_leaks() {
        let c = Config::parse(SAMPLE).unwrap();
        assert!(!format!("{:?}", c).contains("s3cr"));
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("s3cr"));
        assert!(!json.contains("password"));
    }
}
