//! Error types for sshportal.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshportal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Required connection parameters are missing. Raised before any
    /// connection attempt is made.
    #[error("Missing required connection parameters ({missing})")]
    Validation {
        /// Comma-separated names of the missing fields.
        missing: String,
    },

    /// SSH transport-level errors (connect, authenticate, disconnect).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors (exec, shell, sftp).
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The remote command exited with a nonzero status. This is a result,
    /// not a transport fault.
    #[error("Command failed with code {code}: {stderr}")]
    CommandFailed {
        /// Remote exit status.
        code: u32,
        /// Accumulated stderr text.
        stderr: String,
    },

    /// The local source of a file transfer does not exist. Raised before
    /// any remote resource is opened.
    #[error("Local file not found: {}", path.display())]
    LocalFileNotFound { path: PathBuf },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (exec, shell, sftp channels).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// SFTP subsystem or file operation failure
    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Local I/O while copying to or from the channel
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using sshportal's Error.
pub type Result<T> = std::result::Result<T, Error>;
