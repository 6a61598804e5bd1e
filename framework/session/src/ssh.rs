use std::io::{BufRead, BufReader, Read};
use std::net::TcpStream;
use std::path::Path;

use ssh2::{CheckResult, KnownHostFileKind};
use stampede_core::prelude::{Credentials, SessionError};

use crate::{Connector, RemoteCommand, RemoteSession};

/// Opens [SshSession]s over TCP with the `ssh2` crate.
#[derive(Debug, Clone, Default)]
pub struct SshConnector;

impl Connector for SshConnector {
    type Session = SshSession;

    fn connect(&self, host: &str, credentials: &Credentials) -> Result<SshSession, SessionError> {
        SshSession::open(host, credentials)
    }
}

/// One authenticated SSH connection to a client host.
pub struct SshSession {
    host: String,
    session: ssh2::Session,
}

impl SshSession {
    fn open(host: &str, credentials: &Credentials) -> Result<Self, SessionError> {
        let (hostname, port) = split_host_port(host);

        let tcp = TcpStream::connect((hostname, port)).map_err(|e| SessionError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        let mut session = ssh2::Session::new().map_err(|e| SessionError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| SessionError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        check_known_hosts(&session, host, hostname)?;
        authenticate(&session, host, credentials)?;

        Ok(Self {
            host: host.to_string(),
            session,
        })
    }
}

impl RemoteSession for SshSession {
    fn run(&mut self, command: &str) -> Result<Box<dyn RemoteCommand + '_>, SessionError> {
        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| SessionError::Connect {
                host: self.host.clone(),
                reason: format!("could not open channel: {e}"),
            })?;

        channel.exec(command).map_err(|e| SessionError::RemoteCommand {
            host: self.host.clone(),
            detail: format!("could not start command: {e}"),
        })?;

        Ok(Box::new(SshCommand {
            host: &self.host,
            channel,
        }))
    }

    fn put_file(&mut self, local: &Path, remote_path: &str) -> Result<(), SessionError> {
        let transfer_err = |reason: String| SessionError::Transfer {
            host: self.host.clone(),
            reason,
        };

        let mut local_file = std::fs::File::open(local)
            .map_err(|e| transfer_err(format!("could not open {}: {e}", local.display())))?;
        let size = local_file
            .metadata()
            .map_err(|e| transfer_err(e.to_string()))?
            .len();

        let mut remote_file = self
            .session
            .scp_send(Path::new(remote_path), 0o644, size, None)
            .map_err(|e| transfer_err(e.to_string()))?;
        std::io::copy(&mut local_file, &mut remote_file)
            .map_err(|e| transfer_err(e.to_string()))?;

        remote_file.send_eof().map_err(|e| transfer_err(e.to_string()))?;
        remote_file.wait_eof().map_err(|e| transfer_err(e.to_string()))?;
        remote_file.close().map_err(|e| transfer_err(e.to_string()))?;
        remote_file
            .wait_close()
            .map_err(|e| transfer_err(e.to_string()))?;

        Ok(())
    }

    fn close(&mut self) -> Result<(), SessionError> {
        self.session
            .disconnect(None, "benchmark run finished", None)
            .map_err(|e| SessionError::Connect {
                host: self.host.clone(),
                reason: format!("disconnect failed: {e}"),
            })
    }
}

struct SshCommand<'s> {
    host: &'s str,
    channel: ssh2::Channel,
}

impl SshCommand<'_> {
    fn command_err(&self, detail: String) -> SessionError {
        SessionError::RemoteCommand {
            host: self.host.to_string(),
            detail,
        }
    }
}

impl RemoteCommand for SshCommand<'_> {
    fn drain_stdout(&mut self, sink: &mut dyn FnMut(&str)) -> Result<(), SessionError> {
        let host = self.host.to_string();
        let reader = BufReader::new(&mut self.channel);
        for line in reader.lines() {
            let line = line.map_err(|e| SessionError::RemoteCommand {
                host: host.clone(),
                detail: format!("error while reading stdout: {e}"),
            })?;
            sink(&line);
        }

        Ok(())
    }

    fn drain_stderr(&mut self) -> Result<String, SessionError> {
        let mut text = String::new();
        self.channel
            .stderr()
            .read_to_string(&mut text)
            .map_err(|e| self.command_err(format!("error while reading stderr: {e}")))?;

        Ok(text)
    }

    fn finish(&mut self) -> Result<i32, SessionError> {
        self.channel
            .wait_close()
            .map_err(|e| self.command_err(format!("error while waiting for close: {e}")))?;
        self.channel
            .exit_status()
            .map_err(|e| self.command_err(format!("could not read exit status: {e}")))
    }
}

/// Verify the host against the local known-hosts store.
///
/// A key mismatch refuses the connection, and so does a check that fails to
/// verify the presented key at all. A host that is simply not listed is
/// allowed through with a warning, since benchmark clients are routinely fresh
/// machines.
fn check_known_hosts(
    session: &ssh2::Session,
    host: &str,
    hostname: &str,
) -> Result<(), SessionError> {
    let mut known_hosts = session.known_hosts().map_err(|e| SessionError::Connect {
        host: host.to_string(),
        reason: e.to_string(),
    })?;

    let Some(home) = std::env::var_os("HOME") else {
        log::warn!("HOME is not set, skipping known-hosts verification for {host}");
        return Ok(());
    };
    let known_hosts_path = Path::new(&home).join(".ssh").join("known_hosts");
    if !known_hosts_path.exists() {
        log::warn!(
            "No known-hosts store at {}, skipping verification for {host}",
            known_hosts_path.display()
        );
        return Ok(());
    }

    known_hosts
        .read_file(&known_hosts_path, KnownHostFileKind::OpenSSH)
        .map_err(|e| SessionError::Connect {
            host: host.to_string(),
            reason: format!("could not read known-hosts store: {e}"),
        })?;

    let (key, _) = session.host_key().ok_or_else(|| SessionError::Auth {
        host: host.to_string(),
        reason: "host presented no key".to_string(),
    })?;

    match known_hosts.check(hostname, key) {
        CheckResult::Match => Ok(()),
        CheckResult::Mismatch => Err(SessionError::Auth {
            host: host.to_string(),
            reason: "host key does not match the known-hosts entry".to_string(),
        }),
        CheckResult::NotFound => {
            log::warn!("{host} is not in the known-hosts store, continuing");
            Ok(())
        }
        CheckResult::Failure => Err(SessionError::Auth {
            host: host.to_string(),
            reason: "the presented host key could not be checked against the known-hosts store"
                .to_string(),
        }),
    }
}

/// Authenticate with an explicit key file if one is given, then a password,
/// then the local SSH agent.
fn authenticate(
    session: &ssh2::Session,
    host: &str,
    credentials: &Credentials,
) -> Result<(), SessionError> {
    let username = credentials.effective_username();
    let auth_err = |reason: String| SessionError::Auth {
        host: host.to_string(),
        reason,
    };

    if let Some(key_path) = &credentials.key_path {
        session
            .userauth_pubkey_file(&username, None, key_path, None)
            .map_err(|e| auth_err(format!("key authentication as {username} failed: {e}")))?;
    } else if let Some(password) = &credentials.password {
        session
            .userauth_password(&username, password)
            .map_err(|e| auth_err(format!("password authentication as {username} failed: {e}")))?;
    } else {
        session
            .userauth_agent(&username)
            .map_err(|e| auth_err(format!("agent authentication as {username} failed: {e}")))?;
    }

    if !session.authenticated() {
        return Err(auth_err(format!("{username} is not authenticated")));
    }

    Ok(())
}

fn split_host_port(host: &str) -> (&str, u16) {
    match host.rsplit_once(':') {
        Some((hostname, port)) => match port.parse::<u16>() {
            Ok(port) => (hostname, port),
            Err(_) => (host, 22),
        },
        None => (host, 22),
    }
}

#[cfg(test)]
mod tests {
    use super::split_host_port;

    #[test]
    fn splits_an_explicit_port() {
        assert_eq!(split_host_port("h1:2222"), ("h1", 2222));
    }

    #[test]
    fn defaults_to_port_22() {
        assert_eq!(split_host_port("h1"), ("h1", 22));
        assert_eq!(split_host_port("h1:not-a-port"), ("h1:not-a-port", 22));
    }
}
