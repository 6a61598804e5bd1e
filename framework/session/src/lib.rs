mod ssh;

pub use ssh::{SshConnector, SshSession};

use std::path::Path;

use stampede_core::prelude::{Credentials, SessionError};

/// Opens authenticated sessions to client hosts.
///
/// The orchestration layer is generic over this trait so that provisioning and
/// phase execution can be exercised in tests without a network.
pub trait Connector: Send + Sync + 'static {
    type Session: RemoteSession;

    /// Establish one connection to `host`. Authentication failures and
    /// connection failures are reported as distinct [SessionError] kinds so
    /// the caller can decide what to do. Never retried here.
    fn connect(&self, host: &str, credentials: &Credentials) -> Result<Self::Session, SessionError>;
}

/// One authenticated connection to one host.
///
/// The caller owns the session for the duration of a provisioning or phase
/// step and must close it on every exit path. A session leaked open is a
/// resource leak on the remote side.
pub trait RemoteSession {
    /// Start `command` on the remote host. This does not wait for the command
    /// to complete; it hands back live streams for the caller to drain.
    fn run(&mut self, command: &str) -> Result<Box<dyn RemoteCommand + '_>, SessionError>;

    /// Copy a local file to `remote_path` on the host.
    fn put_file(&mut self, local: &Path, remote_path: &str) -> Result<(), SessionError>;

    /// Close the connection.
    fn close(&mut self) -> Result<(), SessionError>;
}

/// A command in flight on a remote host.
///
/// Draining is deterministic: read stdout to EOF first, then stderr, then wait
/// for the exit status. Every call may block indefinitely; there is no timeout
/// on remote commands.
pub trait RemoteCommand {
    /// Read stdout line by line until EOF, passing each line to `sink`.
    fn drain_stdout(&mut self, sink: &mut dyn FnMut(&str)) -> Result<(), SessionError>;

    /// Drain stderr to completion and return the captured text.
    fn drain_stderr(&mut self) -> Result<String, SessionError>;

    /// Wait for the command to finish and return its exit status.
    fn finish(&mut self) -> Result<i32, SessionError>;
}
