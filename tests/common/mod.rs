#![allow(dead_code)]
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use replay_sender::config::Config;
use replay_sender::parse::Endpoint;
use replay_sender::transfer::{RemoteClient, RemoteConnector};

/// What the fake server saw, shared between the connector and every client it hands out.
#[derive(Default)]
pub struct ServerLog {
    pub connects: usize,
    pub logins: usize,
    pub quits: usize,
    pub uploads: Vec<String>,
    pub stored: HashMap<String, Vec<u8>>,
}

/// In-memory stand-in for an FTP server.
#[derive(Default, Clone)]
pub struct FakeServer {
    pub log: Arc<Mutex<ServerLog>>,
    pub refuse_connect: bool,
    pub reject_login: bool,
    /// Uploads of these names fail midway with a simulated network error.
    pub fail_names: HashSet<String>,
    /// `quit` answers with an error, like a server that already hung up.
    pub fail_quit: bool,
    /// Written into the local filesystem during the first upload, standing in for the
    /// producer dropping a new replay mid-cycle.
    pub arrives_during_upload: Option<PathBuf>,
}

impl FakeServer {
    pub fn failing(names: &[&str]) -> Self {
        Self { fail_names: names.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, ServerLog> {
        self.log.lock().unwrap()
    }
}

struct FakeClient {
    server: FakeServer,
}

impl RemoteClient for FakeClient {
    fn login(&mut self, _username: &str, _password: &str) -> Result<(), String> {
        self.server.log().logins += 1;
        if self.server.reject_login {
            return Err("530 Login incorrect.".to_string());
        }
        Ok(())
    }

    fn put(&mut self, name: &str, reader: &mut dyn Read) -> Result<(), String> {
        let first = {
            let mut log = self.server.log();
            log.uploads.push(name.to_string());
            log.uploads.len() == 1
        };
        if first && let Some(path) = &self.server.arrives_during_upload {
            std::fs::write(path, b"late replay").map_err(|e| e.to_string())?;
        }
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(|e| e.to_string())?;
        if self.server.fail_names.contains(name) {
            return Err("426 Connection closed; transfer aborted.".to_string());
        }
        self.server.log().stored.insert(name.to_string(), data);
        Ok(())
    }

    fn quit(&mut self) -> Result<(), String> {
        self.server.log().quits += 1;
        if self.server.fail_quit {
            return Err("421 Service not available, closing control connection.".to_string());
        }
        Ok(())
    }
}

impl RemoteConnector for FakeServer {
    fn connect(&self, _endpoint: &Endpoint) -> Result<Box<dyn RemoteClient>, String> {
        self.log().connects += 1;
        if self.refuse_connect {
            return Err("Connection refused (os error 111)".to_string());
        }
        Ok(Box::new(FakeClient { server: self.clone() }))
    }
}

/// Unique scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let nanos =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("replay_sender_{}_{}_{}", tag, std::process::id(), nanos));
    std::fs::create_dir_all(&p).expect("create scratch dir");
    p
}

/// Config watching `<root>/replays` and archiving into `<root>/archive`.
pub fn config_for(root: &std::path::Path) -> Config {
    let watched = root.join("replays");
    let archive = root.join("archive");
    std::fs::create_dir_all(&watched).expect("create watched dir");
    let text = format!(
        "replaypath={}\narchivepath={}\nftpaddr=127.0.0.1:2121\nftpusername=bot\nftppassword=pw\n",
        watched.display(),
        archive.display()
    );
    Config::parse(&text).expect("valid test config")
}
