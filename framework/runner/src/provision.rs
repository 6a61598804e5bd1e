use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use stampede_core::prelude::{Credentials, ExecutionId, HostFailure, PartialFailure, SessionError};
use stampede_session::{Connector, RemoteSession};

/// Harness archive location after the packaging step has run.
#[derive(Debug, Clone)]
pub enum ResolvedArchive {
    /// Already staged at this path on every client host.
    Remote(String),
    /// A local file to transfer to each host.
    Local(PathBuf),
}

/// Install the harness on every client host, one worker per host.
///
/// All hosts are provisioned truly in parallel and the call returns only once
/// every host has finished or failed. A failure on any host makes the overall
/// call fail with a [PartialFailure] naming exactly the failed hosts; there is
/// no partial-success continuation into later phases.
pub fn provision<C: Connector>(
    connector: &Arc<C>,
    hosts: &[String],
    archive: &ResolvedArchive,
    credentials: &Credentials,
    execution_id: &ExecutionId,
) -> Result<(), PartialFailure> {
    let mut workers = Vec::with_capacity(hosts.len());
    for host in hosts {
        let connector = connector.clone();
        let host = host.clone();
        let archive = archive.clone();
        let credentials = credentials.clone();
        let execution_id = execution_id.clone();

        let worker_host = host.clone();
        let handle = std::thread::Builder::new()
            .name(format!("provision-{host}"))
            .spawn(move || {
                provision_host(
                    connector.as_ref(),
                    &worker_host,
                    &archive,
                    &credentials,
                    &execution_id,
                )
            })
            .expect("Failed to spawn provisioning thread");
        workers.push((host, handle));
    }

    let mut failures = Vec::new();
    for (host, handle) in workers {
        let outcome = handle
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("provisioning worker panicked")));
        if let Err(e) = outcome {
            log::error!("Error while provisioning client {host}: {e:#}");
            failures.push(HostFailure {
                host,
                error: format!("{e:#}"),
            });
        }
    }

    match PartialFailure::from_failures(failures) {
        Some(failure) => Err(failure),
        None => {
            log::info!("Clients provisioned successfully");
            Ok(())
        }
    }
}

fn provision_host<C: Connector>(
    connector: &C,
    host: &str,
    archive: &ResolvedArchive,
    credentials: &Credentials,
    execution_id: &ExecutionId,
) -> anyhow::Result<()> {
    log::info!("Provisioning client at {host}");

    let mut session = connector.connect(host, credentials)?;
    let outcome = install_harness(&mut session, host, archive, execution_id);
    if let Err(e) = session.close() {
        log::warn!("Failed to close session for {host}: {e}");
    }

    outcome
}

fn install_harness<S: RemoteSession + ?Sized>(
    session: &mut S,
    host: &str,
    archive: &ResolvedArchive,
    execution_id: &ExecutionId,
) -> anyhow::Result<()> {
    let harness_dir = execution_id.harness_dir();
    exec_checked(session, host, &format!("mkdir -p {harness_dir}"))
        .with_context(|| format!("could not create remote directory {harness_dir}"))?;

    let remote_archive = match archive {
        ResolvedArchive::Remote(path) => path.clone(),
        ResolvedArchive::Local(local) => {
            let file_name = local
                .file_name()
                .and_then(|n| n.to_str())
                .context("archive path has no file name")?;
            let remote = format!("{}/{file_name}", execution_id.remote_root());
            log::info!("Copying harness distribution to {host}:{remote} (might take a while)");
            session.put_file(local, &remote)?;
            remote
        }
    };

    log::info!("Extracting harness from {host}:{remote_archive} to {host}:{harness_dir}");
    let command = format!("tar -xf {remote_archive} -C {harness_dir} --strip-components 1");
    let mut extract = session.run(&command)?;
    extract.drain_stdout(&mut |_| {})?;
    // Verbose extraction output lands on stderr and is informational only; the
    // exit status decides whether extraction worked.
    let stderr = extract.drain_stderr()?;
    if !stderr.trim().is_empty() {
        log::debug!("{host}: tar reported: {}", stderr.trim());
    }
    let status = extract.finish()?;
    if status != 0 {
        return Err(SessionError::RemoteCommand {
            host: host.to_string(),
            detail: format!("extraction exited with status {status}"),
        }
        .into());
    }

    log::info!("Client {host} ready");
    Ok(())
}

/// Run a short remote command where any stderr output or a non-zero exit
/// status means failure.
fn exec_checked<S: RemoteSession + ?Sized>(
    session: &mut S,
    host: &str,
    command: &str,
) -> anyhow::Result<()> {
    let mut cmd = session.run(command)?;
    cmd.drain_stdout(&mut |_| {})?;
    let stderr = cmd.drain_stderr()?;
    let status = cmd.finish()?;

    if !stderr.trim().is_empty() {
        return Err(SessionError::RemoteCommand {
            host: host.to_string(),
            detail: stderr.trim().to_string(),
        }
        .into());
    }
    if status != 0 {
        return Err(SessionError::RemoteCommand {
            host: host.to_string(),
            detail: format!("exited with status {status}"),
        }
        .into());
    }

    Ok(())
}
