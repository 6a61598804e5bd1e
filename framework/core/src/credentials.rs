use std::path::PathBuf;

/// SSH credentials for reaching the client fleet.
///
/// Every field is optional. When no key and no password are given, agent or
/// system host-key authentication is attempted. That only becomes an error if
/// the target host insists on interactive authentication.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Path to a private key file to authenticate with.
    pub key_path: Option<PathBuf>,
    /// The username to authenticate as. Defaults to the local username.
    pub username: Option<String>,
    /// Password to authenticate with, used when no key is given.
    pub password: Option<String>,
}

impl Credentials {
    /// The username to present to the remote host.
    pub fn effective_username(&self) -> String {
        self.username
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "root".to_string())
    }
}
