use std::fmt;
use thiserror::Error;

/// Fatal configuration problems. These are never retried and abort the run.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no harness archive source is configured, set one of ycsb_remote_tar_path, ycsb_tar_path or ycsb_path")]
    MissingHarnessSource,
    #[error("cluster endpoint is not provided and instantiating a new cluster is not implemented")]
    MissingClusterEndpoint,
    #[error("no client hosts are provided, set client url_list in the configuration")]
    MissingClientHosts,
    #[error("{field} contains characters that are not safe in a shell command: {value:?}")]
    UnsafeField { field: &'static str, value: String },
}

/// Errors raised by a remote session.
///
/// Authentication failures and connection failures are distinct so that a
/// caller can decide how to treat each kind. Nothing in this crate retries
/// automatically.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication to {host} failed: {reason}")]
    Auth { host: String, reason: String },
    #[error("could not connect to {host}: {reason}")]
    Connect { host: String, reason: String },
    #[error("file transfer to {host} failed: {reason}")]
    Transfer { host: String, reason: String },
    #[error("remote command on {host} failed: {detail}")]
    RemoteCommand { host: String, detail: String },
}

impl SessionError {
    /// The host this error was observed on.
    pub fn host(&self) -> &str {
        match self {
            SessionError::Auth { host, .. }
            | SessionError::Connect { host, .. }
            | SessionError::Transfer { host, .. }
            | SessionError::RemoteCommand { host, .. } => host,
        }
    }
}

/// The failure of a single host within a fleet-wide call.
#[derive(Debug, Clone)]
pub struct HostFailure {
    pub host: String,
    pub error: String,
}

impl fmt::Display for HostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.host, self.error)
    }
}

/// Aggregate error for a provisioning or phase call where one or more hosts
/// failed. Hosts that succeeded are not listed.
#[derive(Debug)]
pub struct PartialFailure {
    failures: Vec<HostFailure>,
}

impl PartialFailure {
    /// Returns `None` when no host failed.
    pub fn from_failures(failures: Vec<HostFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    pub fn failures(&self) -> &[HostFailure] {
        &self.failures
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.host.as_str())
    }
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} host(s) failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PartialFailure {}
