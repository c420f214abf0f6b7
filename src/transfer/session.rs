use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::remote::{RemoteClient, RemoteConnector};
use crate::TransferError;
use crate::parse::Endpoint;

/// Linear session lifecycle; a closed session is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connected,
    Authenticated,
    Closed,
}

/// One remote connection, used for exactly one cycle.
///
/// The connection is released by [`TransferSession::close`] or, failing that, on drop, so
/// every exit path of a cycle gives it back.
pub struct TransferSession<'a> {
    connector: &'a dyn RemoteConnector,
    client: Option<Box<dyn RemoteClient>>,
    state: SessionState,
    endpoint: Option<Endpoint>,
}

impl<'a> TransferSession<'a> {
    pub fn new(connector: &'a dyn RemoteConnector) -> Self {
        Self { connector, client: None, state: SessionState::Unconnected, endpoint: None }
    }

    /// Connect and log in in one go, the way a cycle opens its session.
    pub fn open(
        connector: &'a dyn RemoteConnector,
        endpoint: &Endpoint,
        username: &str,
        password: &str,
    ) -> Result<Self, TransferError> {
        let mut sess = Self::new(connector);
        sess.connect(endpoint)?;
        sess.authenticate(username, password)?;
        Ok(sess)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransferError> {
        self.require("connect", SessionState::Unconnected)?;
        let client = self
            .connector
            .connect(endpoint)
            .map_err(|e| TransferError::Connection(endpoint.to_string(), e))?;
        self.client = Some(client);
        self.endpoint = Some(endpoint.clone());
        self.state = SessionState::Connected;
        tracing::debug!("[session] connected to {}", endpoint);
        Ok(())
    }

    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<(), TransferError> {
        self.require("authenticate", SessionState::Connected)?;
        let client = self.client_mut("authenticate")?;
        client.login(username, password).map_err(|e| TransferError::Auth(username.to_string(), e))?;
        self.state = SessionState::Authenticated;
        tracing::debug!("[session] authenticated as {}", username);
        Ok(())
    }

    /// Send the whole file under its base name. No internal retry; a failure may leave a
    /// partial object remotely, which the next successful upload overwrites.
    pub fn upload(&mut self, local: &Path) -> Result<u64, TransferError> {
        self.require("upload", SessionState::Authenticated)?;
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                TransferError::LocalRead(local.display().to_string(), "no file name".to_string())
            })?;
        let file = File::open(local).map_err(|e| TransferError::LocalRead(name.clone(), e.to_string()))?;
        let mut reader = CountingReader::new(BufReader::new(file));
        let client = self.client_mut("upload")?;
        client.put(&name, &mut reader).map_err(|e| TransferError::Transfer(name.clone(), e))?;
        Ok(reader.count)
    }

    /// Release the connection. Safe to call in any state and more than once; only the
    /// first call on a connected session talks to the server.
    pub fn close(&mut self) -> Result<(), TransferError> {
        self.state = SessionState::Closed;
        match self.client.take() {
            Some(mut client) => {
                let res = client.quit().map_err(TransferError::Close);
                if let Some(ep) = &self.endpoint {
                    tracing::debug!("[session] closed connection to {}", ep);
                }
                res
            }
            None => Ok(()),
        }
    }

    fn require(&self, op: &'static str, expected: SessionState) -> Result<(), TransferError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TransferError::InvalidState { op, state: self.state })
        }
    }

    fn client_mut(&mut self, op: &'static str) -> Result<&mut Box<dyn RemoteClient>, TransferError> {
        let state = self.state;
        self.client.as_mut().ok_or(TransferError::InvalidState { op, state })
    }
}

impl Drop for TransferSession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("[session] {}", e);
        }
    }
}

struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
