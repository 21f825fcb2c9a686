//! # sshportal
//!
//! Remote command execution, file transfer, and interactive shells over
//! SSH, with clean output: login banners are filtered out of the live
//! stream, and one-shot command results are deduplicated and stripped of
//! echo artifacts.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Automatic exec-vs-shell mode selection per command
//! - Stateful banner/MOTD filtering over chunked byte streams
//! - SFTP file transfer
//! - Optional raw session transcript
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshportal::{ConnectionConfig, Session, SessionOptions};
//! use sshportal::config::{ConnectionOverrides, ConfigMap};
//!
//! #[tokio::main]
//! async fn main() -> sshportal::Result<()> {
//!     let config = ConnectionConfig::resolve(
//!         ConnectionOverrides {
//!             host: Some("192.168.1.100".into()),
//!             user: Some("admin".into()),
//!             password: Some("secret".into()),
//!             port: None,
//!         },
//!         &ConfigMap::new(),
//!     )?;
//!
//!     let mut session = Session::new(config, SessionOptions::default());
//!     session.execute("uname -a").await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use command::{classify, ExecMode};
pub use config::ConnectionConfig;
pub use error::{ChannelError, Error, Result, TransportError};
pub use filter::{BannerFilter, PromptMatcher, ShellPromptMatcher};
pub use session::{Session, SessionOptions, SessionState, SessionTuning, Transcript};
pub use transport::SshTransport;
