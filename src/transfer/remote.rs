use std::io::Read;

use crate::parse::Endpoint;

/// Trait abstracting the remote operations a session needs. Errors are plain strings so
/// tests can inject in-memory clients without depending on the protocol crate.
pub trait RemoteClient: Send {
    fn login(&mut self, username: &str, password: &str) -> Result<(), String>;
    /// Store `reader`'s content under `name` in the remote working directory, replacing
    /// any existing object with that name.
    fn put(&mut self, name: &str, reader: &mut dyn Read) -> Result<(), String>;
    fn quit(&mut self) -> Result<(), String>;
}

/// Opens one connection per call.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RemoteClient>, String>;
}

/// Connector for plain FTP servers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpConnector;

impl RemoteConnector for FtpConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn RemoteClient>, String> {
        let stream =
            ftp::FtpStream::connect(endpoint.socket_addr()).map_err(|e| e.to_string())?;
        Ok(Box::new(FtpAdapter(stream)))
    }
}

/// Adapter that owns an `ftp::FtpStream` and implements `RemoteClient`.
pub struct FtpAdapter(pub ftp::FtpStream);

impl RemoteClient for FtpAdapter {
    fn login(&mut self, username: &str, password: &str) -> Result<(), String> {
        self.0.login(username, password).map_err(|e| e.to_string())?;
        // replays are binary; ASCII mode would mangle them
        self.0.transfer_type(ftp::types::FileType::Binary).map_err(|e| e.to_string())
    }

    fn put(&mut self, name: &str, mut reader: &mut dyn Read) -> Result<(), String> {
        self.0.put(name, &mut reader).map_err(|e| e.to_string())
    }

    fn quit(&mut self) -> Result<(), String> {
        self.0.quit().map_err(|e| e.to_string())
    }
}
