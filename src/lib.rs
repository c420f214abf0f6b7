pub mod archive;
pub mod config;
pub mod cycle;
pub mod error;
pub mod parse;
pub mod scheduler;
pub mod transfer;
pub mod util;

pub use error::ArchiveError;
pub use error::ConfigError;
pub use error::TransferError;
