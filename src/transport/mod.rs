//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level connection management: connect,
//! authenticate, and open exec/shell/sftp channels. Everything above it
//! treats the transport as an opaque channel provider.

mod ssh;

pub use ssh::SshTransport;
