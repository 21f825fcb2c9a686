//! SSH transport implementation using russh.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{HashAlg, PublicKey};
use russh::Channel;
use secrecy::ExposeSecret;

use crate::config::ConnectionConfig;
use crate::error::{ChannelError, Result, TransportError};

/// SSH transport wrapping a russh client session.
///
/// Owns exactly one authenticated connection. Channels are opened one at a
/// time by the session controller; the transport itself does no pooling.
pub struct SshTransport {
    session: Handle<PortalHandler>,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate with a password.
    ///
    /// Fails with [`TransportError::Timeout`] if the server does not become
    /// ready within `timeout`, and [`TransportError::AuthenticationFailed`]
    /// if the credentials are rejected.
    pub async fn connect(config: &ConnectionConfig, timeout: Duration) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let handler = PortalHandler {
            accept_unknown: config.accept_unknown_cert,
        };

        debug!("connecting to {}:{}", config.host, config.port);

        let mut session = tokio::time::timeout(
            timeout,
            client::connect(
                ssh_config,
                (config.host.as_str(), config.port),
                handler,
            ),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(TransportError::Ssh)?;

        let authenticated = session
            .authenticate_password(&config.user, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !authenticated {
            return Err(TransportError::AuthenticationFailed {
                user: config.user.clone(),
            }
            .into());
        }

        debug!("connection established");
        Ok(Self { session })
    }

    /// Open a one-shot exec channel running `command`.
    ///
    /// The channel delivers stdout as data, stderr as extended data, and an
    /// exit status, then closes.
    pub async fn open_exec(&self, command: &str) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(ChannelError::Ssh)?;

        channel
            .exec(true, command)
            .await
            .map_err(ChannelError::Ssh)?;

        Ok(channel)
    }

    /// Open a persistent interactive shell channel with a PTY.
    pub async fn open_shell(&self, cols: u32, rows: u32) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(ChannelError::Ssh)?;

        channel
            .request_pty(true, "xterm", cols, rows, 0, 0, &[])
            .await
            .map_err(ChannelError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(ChannelError::Ssh)?;

        Ok(channel)
    }

    /// Open an SFTP session for file transfer.
    pub async fn open_sftp(&self) -> Result<russh_sftp::client::SftpSession> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(ChannelError::Ssh)?;

        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(ChannelError::Ssh)?;

        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(ChannelError::Sftp)?;

        Ok(sftp)
    }

    /// Disconnect from the server.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// russh client handler implementing the host key policy.
struct PortalHandler {
    accept_unknown: bool,
}

impl client::Handler for PortalHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if self.accept_unknown {
            debug!(
                "accepting server key: {}",
                server_public_key.fingerprint(HashAlg::Sha256)
            );
            Ok(true)
        } else {
            warn!("rejecting unknown server key (accept_unknown_cert=false)");
            Ok(false)
        }
    }
}
