// transfer module: remote session used by a cycle plus the client seam it runs over
mod remote;
mod session;

pub use remote::{FtpAdapter, FtpConnector, RemoteClient, RemoteConnector};
pub use session::{SessionState, TransferSession};
