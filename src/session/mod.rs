//! Session lifecycle: connect, pick a channel type, relay, tear down.
//!
//! One `Session` exists per invocation. It owns exactly one transport and
//! at most one active channel, decides between one-shot exec and an
//! interactive PTY shell, pipes shell output through the banner filter,
//! forwards keyboard input, and performs best-effort teardown on close,
//! error, signal, or timeout.

mod transcript;

pub use transcript::Transcript;

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace, warn};
use russh::ChannelMsg;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{sleep, sleep_until, Instant};

use crate::command::{self, ExecMode};
use crate::config::ConnectionConfig;
use crate::error::{ChannelError, Error, Result, TransportError};
use crate::filter::{normalize, BannerFilter};
use crate::session::transcript::log_raw;
use crate::transport::SshTransport;

/// Session lifecycle states. `Closed` is terminal; any state may move to
/// `Closing` on error, stream close, signal, or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Executing,
    Shelling,
    Closing,
    Closed,
}

/// Per-invocation output options.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Suppress informational chatter (mode banners, transfer notices).
    pub quiet: bool,

    /// Append a raw transcript of the session to this file.
    pub log_file: Option<PathBuf>,
}

/// Timing knobs for the shell negotiation dance.
///
/// The settle and gap delays are workarounds for unpredictable remote
/// shell startup, not protocol guarantees; they are tunable for exactly
/// that reason.
#[derive(Debug, Clone)]
pub struct SessionTuning {
    /// Upper bound on connect + authenticate.
    pub connect_timeout: Duration,

    /// Delay between first prompt detection and the terminal-size command.
    pub prompt_settle: Duration,

    /// Delay between the terminal-size command and the actual command.
    pub command_gap: Duration,

    /// Upper bound on a pre-supplied interactive command, measured from
    /// dispatch. Full interactive mode has no bound.
    pub interactive_timeout: Duration,

    /// Teardown: delay between the interrupt byte and `exit`.
    pub interrupt_gap: Duration,

    /// Teardown: delay between `exit` and forcibly ending the channel.
    pub exit_gap: Duration,

    /// PTY dimensions, also applied remotely via `stty`.
    pub terminal_cols: u32,
    pub terminal_rows: u32,
}

impl Default for SessionTuning {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            prompt_settle: Duration::from_millis(500),
            command_gap: Duration::from_millis(200),
            interactive_timeout: Duration::from_secs(300),
            interrupt_gap: Duration::from_millis(100),
            exit_gap: Duration::from_millis(300),
            terminal_cols: 120,
            terminal_rows: 30,
        }
    }
}

/// Where the shell relay is in the prompt-then-command dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchPhase {
    /// Waiting for the banner filter to see the first prompt.
    AwaitPrompt,
    /// Prompt seen; letting the terminal settle before `stty`.
    Settle,
    /// Size command sent; waiting before dispatching the user command.
    SizeSent,
    /// Nothing left to dispatch.
    Done,
}

/// A single SSH session: one transport, at most one channel, optional
/// transcript. Created per invocation and destroyed on completion.
pub struct Session {
    config: ConnectionConfig,
    options: SessionOptions,
    tuning: SessionTuning,
    transport: Option<SshTransport>,
    transcript: Option<Transcript>,
    state: SessionState,
}

impl Session {
    /// Create a session. Opens the transcript sink if one is configured;
    /// transcript setup failure is a warning, never fatal.
    pub fn new(config: ConnectionConfig, options: SessionOptions) -> Self {
        let transcript = options.log_file.as_deref().and_then(Transcript::open);
        Self {
            config,
            options,
            tuning: SessionTuning::default(),
            transport: None,
            transcript,
            state: SessionState::Idle,
        }
    }

    /// Replace the default timing knobs.
    pub fn with_tuning(mut self, tuning: SessionTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn set_state(&mut self, next: SessionState) {
        trace!("session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Open and authenticate the transport.
    async fn connect(&mut self) -> Result<()> {
        self.set_state(SessionState::Connecting);
        match SshTransport::connect(&self.config, self.tuning.connect_timeout).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.set_state(SessionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_state(SessionState::Closing);
                self.finish_teardown().await;
                Err(e)
            }
        }
    }

    /// Execute a command, choosing exec or shell mode automatically, and
    /// print its output. The session is closed when this returns.
    pub async fn execute(&mut self, command: &str) -> Result<()> {
        match command::classify(command) {
            ExecMode::OneShot => {
                debug!("using exec mode for non-interactive command");
                let lines = self.exec_one_shot(command).await?;
                for line in &lines {
                    println!("{line}");
                }
                Ok(())
            }
            ExecMode::Interactive => {
                debug!("detected interactive command, using shell mode");
                self.run_shell(Some(command)).await.map(drop)
            }
        }
    }

    /// Run a command on a one-shot exec channel and return the normalized
    /// output lines. Nonzero exit maps to [`Error::CommandFailed`].
    pub async fn exec_one_shot(&mut self, command: &str) -> Result<Vec<String>> {
        self.connect().await?;
        self.set_state(SessionState::Executing);

        debug!("executing command: {}", command);
        let outcome = self.exec_channel_loop(command).await;

        self.set_state(SessionState::Closing);
        self.finish_teardown().await;

        let (exit_code, stdout, stderr) = outcome?;
        finish_exec(command, exit_code, &stdout, &stderr)
    }

    /// Drive the exec channel to completion, separating stdout and stderr.
    async fn exec_channel_loop(&mut self, command: &str) -> Result<(u32, String, String)> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(TransportError::Disconnected)?;
        let mut channel = transport.open_exec(command).await?;

        let mut stdout = BytesMut::new();
        let mut stderr = BytesMut::new();
        let mut exit_code: Option<u32> = None;
        let mut clean_close = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    log_raw(&mut self.transcript, &data);
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, .. }) => {
                    if let Some(t) = self.transcript.as_mut() {
                        t.append_str("STDERR: ");
                        t.append(&data);
                    }
                    stderr.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = Some(exit_status);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) => {
                    clean_close = true;
                    break;
                }
                None => break,
                Some(_) => {}
            }
        }

        let exit_code = exec_exit_code(exit_code, clean_close)?;
        debug!("command completed with code {}", exit_code);
        Ok((
            exit_code,
            String::from_utf8_lossy(&stdout).into_owned(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }

    /// Start a full interactive shell: all keyboard input is forwarded for
    /// the life of the session, with no timeout.
    pub async fn interactive_shell(&mut self) -> Result<()> {
        if !self.options.quiet {
            println!("SSH Portal - Interactive mode (Ctrl+C to exit)");
        }
        self.run_shell(None).await.map(drop)
    }

    /// Open a PTY shell and relay bytes until the stream closes, a signal
    /// arrives, or (pre-supplied command only) the timeout fires.
    ///
    /// Returns the accumulated raw output, whatever was received before
    /// termination.
    async fn run_shell(&mut self, command: Option<&str>) -> Result<String> {
        self.connect().await?;
        self.set_state(SessionState::Shelling);

        let transport = self
            .transport
            .as_ref()
            .ok_or(TransportError::Disconnected)?;
        let mut channel = transport
            .open_shell(self.tuning.terminal_cols, self.tuning.terminal_rows)
            .await?;
        debug!("shell session created");

        let mut banner = BannerFilter::new();
        let mut decode_out = Utf8Carry::new();
        let mut decode_err = Utf8Carry::new();
        let mut output = String::new();
        let mut stdout = tokio::io::stdout();
        let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

        // Single re-armable timer drives the settle -> stty -> command
        // dispatch sequence.
        let mut phase = DispatchPhase::AwaitPrompt;
        let mut timer_at = Instant::now();
        let mut timer_armed = false;

        // The 5-minute cap applies only once a pre-supplied command has
        // been dispatched.
        let mut deadline_at = Instant::now();
        let mut deadline_armed = false;

        // Full interactive mode forwards input from the start; the
        // single-command case only after dispatch.
        let mut input_open = true;
        let mut dispatched = command.is_none();

        let mut relay_error: Option<Error> = None;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let terminate = terminate_signal();
        tokio::pin!(terminate);

        loop {
            tokio::select! {
                msg = channel.wait() => {
                    match msg {
                        Some(ChannelMsg::Data { data }) => {
                            log_raw(&mut self.transcript, &data);
                            let text = decode_out.decode(&data);
                            output.push_str(&text);

                            let visible = banner.process(&text);
                            if !visible.is_empty() {
                                let _ = stdout.write_all(visible.as_bytes()).await;
                                let _ = stdout.flush().await;
                            }

                            if phase == DispatchPhase::AwaitPrompt && banner.cleared() {
                                phase = DispatchPhase::Settle;
                                timer_at = Instant::now() + self.tuning.prompt_settle;
                                timer_armed = true;
                            }
                        }
                        Some(ChannelMsg::ExtendedData { data, .. }) => {
                            log_raw(&mut self.transcript, &data);
                            let text = decode_err.decode(&data);
                            output.push_str(&text);
                            let visible = banner.process(&text);
                            if !visible.is_empty() {
                                let _ = stdout.write_all(visible.as_bytes()).await;
                                let _ = stdout.flush().await;
                            }
                        }
                        Some(ChannelMsg::ExitStatus { exit_status }) => {
                            debug!("shell exit status: {}", exit_status);
                        }
                        Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) => {
                            debug!("shell stream closed");
                            break;
                        }
                        None => {
                            debug!("shell connection ended");
                            break;
                        }
                        Some(_) => {}
                    }
                }

                _ = sleep_until(timer_at), if timer_armed => {
                    timer_armed = false;
                    match phase {
                        DispatchPhase::Settle => {
                            let size_cmd = format!(
                                "stty cols {} rows {}\n",
                                self.tuning.terminal_cols, self.tuning.terminal_rows
                            );
                            if let Err(e) = channel.data(size_cmd.as_bytes()).await {
                                relay_error = Some(ChannelError::Ssh(e).into());
                                break;
                            }
                            phase = DispatchPhase::SizeSent;
                            timer_at = Instant::now() + self.tuning.command_gap;
                            timer_armed = true;
                        }
                        DispatchPhase::SizeSent => {
                            if let Some(cmd) = command {
                                debug!("sending interactive command: {}", cmd);
                                let line = format!("{cmd}\n");
                                if let Err(e) = channel.data(line.as_bytes()).await {
                                    relay_error = Some(ChannelError::Ssh(e).into());
                                    break;
                                }
                                deadline_at = Instant::now() + self.tuning.interactive_timeout;
                                deadline_armed = true;
                            }
                            dispatched = true;
                            phase = DispatchPhase::Done;
                        }
                        DispatchPhase::AwaitPrompt | DispatchPhase::Done => {}
                    }
                }

                line = stdin_lines.next_line(), if input_open && dispatched => {
                    match line {
                        Ok(Some(line)) => {
                            let data = format!("{line}\n");
                            if channel.data(data.as_bytes()).await.is_err() {
                                debug!("input relay failed, channel gone");
                                break;
                            }
                            if let Some(t) = self.transcript.as_mut() {
                                t.append_str("USER INPUT: ");
                                t.append_str(&data);
                            }
                        }
                        Ok(None) | Err(_) => {
                            // Local stdin ended; keep relaying output.
                            input_open = false;
                        }
                    }
                }

                _ = sleep_until(deadline_at), if deadline_armed => {
                    debug!("interactive command timeout reached");
                    break;
                }

                _ = &mut ctrl_c => {
                    if !self.options.quiet {
                        println!("\nExiting...");
                    }
                    break;
                }

                _ = &mut terminate => {
                    debug!("termination signal received");
                    break;
                }
            }
        }

        self.teardown_shell(channel).await;

        match relay_error {
            Some(e) => Err(e),
            None => Ok(output),
        }
    }

    /// Best-effort graceful shutdown of a shell channel: interrupt byte,
    /// exit directive, then force the channel and transport down. Every
    /// step may fail without consequence; the goal is bounded-time
    /// resource release.
    async fn teardown_shell(&mut self, channel: russh::Channel<russh::client::Msg>) {
        self.set_state(SessionState::Closing);
        debug!("cleaning up shell session");

        let _ = channel.data(&b"\x03"[..]).await;
        sleep(self.tuning.interrupt_gap).await;
        let _ = channel.data(&b"exit\n"[..]).await;
        sleep(self.tuning.exit_gap).await;
        let _ = channel.eof().await;
        drop(channel);

        self.finish_teardown().await;
    }

    /// Close the transport and flush the transcript. Safe to call from any
    /// state; errors are swallowed.
    async fn finish_teardown(&mut self) {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("transport close failed: {}", e);
            }
        }
        if let Some(t) = self.transcript.as_mut() {
            t.close();
        }
        self.set_state(SessionState::Closed);
    }

    /// Copy a single local file to the remote host over SFTP.
    ///
    /// Fails fast with [`Error::LocalFileNotFound`] before opening any
    /// remote resource. Channel and transport are closed on success and
    /// on error alike.
    pub async fn transfer(&mut self, local: &Path, remote: &str) -> Result<u64> {
        if !local.exists() {
            return Err(Error::LocalFileNotFound {
                path: local.to_path_buf(),
            });
        }

        debug!("transferring file: {} -> {}", local.display(), remote);
        self.connect().await?;

        let outcome = self.transfer_inner(local, remote).await;

        self.set_state(SessionState::Closing);
        self.finish_teardown().await;

        let bytes = outcome?;
        if !self.options.quiet {
            println!("File transferred: {} -> {}", local.display(), remote);
        }
        Ok(bytes)
    }

    async fn transfer_inner(&mut self, local: &Path, remote: &str) -> Result<u64> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(TransportError::Disconnected)?;
        let sftp = transport.open_sftp().await?;

        let mut local_file = tokio::fs::File::open(local)
            .await
            .map_err(ChannelError::Io)?;

        let mut remote_file = sftp
            .open_with_flags(
                remote,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            )
            .await
            .map_err(ChannelError::Sftp)?;

        let bytes = tokio::io::copy(&mut local_file, &mut remote_file)
            .await
            .map_err(ChannelError::Io)?;
        remote_file.shutdown().await.map_err(ChannelError::Io)?;

        let _ = sftp.close().await;
        debug!("file transferred: {} bytes", bytes);
        Ok(bytes)
    }
}

/// Incremental UTF-8 decoder for the shell relay.
///
/// A multi-byte character split across two reads is held back until its
/// remaining bytes arrive, so the visible stream never shows a U+FFFD for
/// a chunk boundary. Genuinely invalid bytes are still replaced.
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Invalid sequence mid-stream: replace and move on.
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete sequence at the end: at most three
                        // bytes stay pending until the next chunk.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }
}

/// Exit code for a finished exec channel.
///
/// A channel that ends without an exit status is fine after a clean
/// EOF/close (treated as success), but a connection that just drops is a
/// channel fault.
fn exec_exit_code(exit_code: Option<u32>, clean_close: bool) -> Result<u32> {
    match exit_code {
        Some(code) => Ok(code),
        None if clean_close => Ok(0),
        None => Err(ChannelError::Closed.into()),
    }
}

/// Translate an exec channel outcome into a command result.
///
/// Zero exit yields the normalized stdout lines; nonzero exit yields
/// [`Error::CommandFailed`] carrying the code and accumulated stderr.
fn finish_exec(command: &str, exit_code: u32, stdout: &str, stderr: &str) -> Result<Vec<String>> {
    if exit_code != 0 {
        return Err(Error::CommandFailed {
            code: exit_code,
            stderr: stderr.to_string(),
        });
    }
    Ok(normalize::clean(stdout, command))
}

/// Wait for SIGTERM where the platform has one; pend forever elsewhere.
async fn terminate_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("could not install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_exec_success_normalizes() {
        let lines = finish_exec("ls", 0, "ls\nfile1\nfile1\nfile2\n", "").unwrap();
        assert_eq!(lines, vec!["file1", "file2"]);
    }

    #[test]
    fn test_finish_exec_nonzero_carries_code_and_stderr() {
        let err = finish_exec("cat missing", 2, "", "cat: missing: No such file\n").unwrap_err();
        match err {
            Error::CommandFailed { code, stderr } => {
                assert_eq!(code, 2);
                assert_eq!(stderr, "cat: missing: No such file\n");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_finish_exec_failure_ignores_stdout() {
        let err = finish_exec("false", 1, "partial output\n", "").unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: 1, .. }));
    }

    #[test]
    fn test_utf8_split_across_chunks_is_lossless() {
        // "héllo" with the two-byte é split between reads.
        let bytes = "héllo".as_bytes();
        let mut carry = Utf8Carry::new();
        let mut out = String::new();
        out.push_str(&carry.decode(&bytes[..2]));
        out.push_str(&carry.decode(&bytes[2..]));
        assert_eq!(out, "héllo");
    }

    #[test]
    fn test_utf8_every_split_is_lossless() {
        let text = "プロンプト$ ";
        let bytes = text.as_bytes();
        for split in 1..bytes.len() {
            let mut carry = Utf8Carry::new();
            let mut out = String::new();
            out.push_str(&carry.decode(&bytes[..split]));
            out.push_str(&carry.decode(&bytes[split..]));
            assert_eq!(out, text, "split at byte {}", split);
        }
    }

    #[test]
    fn test_invalid_bytes_still_replaced() {
        let mut carry = Utf8Carry::new();
        let out = carry.decode(b"ok\xff\xfeok");
        assert_eq!(out, "ok\u{FFFD}\u{FFFD}ok");
        // Nothing held back once the chunk decodes.
        assert_eq!(carry.decode(b"!"), "!");
    }

    #[test]
    fn test_exec_exit_code_reported_status_wins() {
        assert_eq!(exec_exit_code(Some(2), false).unwrap(), 2);
        assert_eq!(exec_exit_code(Some(0), true).unwrap(), 0);
    }

    #[test]
    fn test_exec_clean_close_without_status_is_success() {
        assert_eq!(exec_exit_code(None, true).unwrap(), 0);
    }

    #[test]
    fn test_exec_dropped_connection_is_channel_fault() {
        let err = exec_exit_code(None, false).unwrap_err();
        assert!(matches!(err, Error::Channel(ChannelError::Closed)));
    }

    #[test]
    fn test_default_tuning_constants() {
        let tuning = SessionTuning::default();
        assert_eq!(tuning.prompt_settle, Duration::from_millis(500));
        assert_eq!(tuning.command_gap, Duration::from_millis(200));
        assert_eq!(tuning.interactive_timeout, Duration::from_secs(300));
        assert_eq!(tuning.connect_timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_missing_local_file_fails_before_connect() {
        let config = crate::config::ConnectionConfig {
            host: "host.invalid".into(),
            port: 22,
            user: "u".into(),
            password: secrecy::SecretString::from("p".to_string()),
            accept_unknown_cert: true,
        };
        let mut session = Session::new(config, SessionOptions::default());

        let err = session
            .transfer(Path::new("/definitely/not/here.txt"), "/tmp/x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::LocalFileNotFound { .. }));
        // No connection was attempted, so the session never left Idle.
        assert_eq!(session.state(), SessionState::Idle);
    }
}
