use std::sync::Arc;

use anyhow::Context;
use stampede_core::prelude::{ConfigurationError, Credentials, ExecutionId};
use stampede_report_model::{write_report, PhaseKind};
use stampede_session::Connector;

use crate::config::{HarnessSource, RunConfig};
use crate::phase::{run_phase, BASELINE_WORKLOAD};
use crate::provision::{provision, ResolvedArchive};
use crate::run_log::RunLog;

/// Run one benchmark campaign end to end.
///
/// Sequencing: resolve the harness archive once, provision the whole fleet
/// once, then for each configured cluster size run the load phase (when
/// enabled) followed by one query phase per configured workload. Provisioning
/// failure is fatal; a phase that completes with failed hosts is logged and
/// the campaign moves on. Phases never overlap and each report is written
/// before the next phase starts.
pub fn run_campaign<C: Connector>(
    connector: Arc<C>,
    config: &RunConfig,
    credentials: &Credentials,
    execution_id: &ExecutionId,
    run_log: &Arc<RunLog>,
) -> anyhow::Result<()> {
    log::info!("Running execution {execution_id}");

    if config.client_hosts.is_empty() {
        return Err(ConfigurationError::MissingClientHosts.into());
    }

    let archive = resolve_archive(&config.harness_source)?;
    if let ResolvedArchive::Local(path) = &archive {
        log::info!("Using harness distribution at {}", path.display());
    }

    provision(
        &connector,
        &config.client_hosts,
        &archive,
        credentials,
        execution_id,
    )
    .map_err(anyhow::Error::new)
    .context("fleet provisioning failed, no benchmarking can proceed")?;

    for cluster_size in &config.cluster_sizes {
        let endpoint = resolve_endpoint(config)?;
        log::info!("Pointing benchmarks at {endpoint} with cluster size {cluster_size}");

        if config.data.load {
            // Load once per cluster size. Workloads with inserts change the
            // dataset size, so the load must not be repeated per workload.
            run_and_persist(
                &connector,
                config,
                credentials,
                execution_id,
                run_log,
                endpoint,
                PhaseKind::Load,
                BASELINE_WORKLOAD,
            )?;
        }

        for workload in &config.data.workloads {
            log::info!("======= Running workload {workload} =======");
            run_and_persist(
                &connector,
                config,
                credentials,
                execution_id,
                run_log,
                endpoint,
                PhaseKind::Query,
                workload,
            )?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_and_persist<C: Connector>(
    connector: &Arc<C>,
    config: &RunConfig,
    credentials: &Credentials,
    execution_id: &ExecutionId,
    run_log: &Arc<RunLog>,
    endpoint: &str,
    phase: PhaseKind,
    workload: &str,
) -> anyhow::Result<()> {
    let report = run_phase(
        connector,
        &config.client_hosts,
        endpoint,
        workload,
        phase,
        config,
        credentials,
        execution_id,
        run_log,
    )?;

    let path = config.report_dir.join(report.file_name(execution_id.as_str()));
    write_report(&report, &path)
        .with_context(|| format!("Failed to write phase report to {}", path.display()))?;
    log::info!("Wrote {phase} phase report to {}", path.display());

    if let Some(failure) = report.partial_failure() {
        log::warn!(
            "{phase} phase for workload {} completed with failures: {failure}",
            report.workload
        );
    }

    Ok(())
}

/// Resolve the configured harness source into a concrete archive, packaging a
/// build tree when that is the active mode.
fn resolve_archive(source: &HarnessSource) -> anyhow::Result<ResolvedArchive> {
    match source {
        HarnessSource::RemoteStaged(path) => Ok(ResolvedArchive::Remote(path.clone())),
        HarnessSource::LocalArchive(path) => Ok(ResolvedArchive::Local(path.clone())),
        HarnessSource::BuildTree(path) => {
            let archive = stampede_packager::package(path)
                .context("Failed to package the harness build tree")?;
            Ok(ResolvedArchive::Local(archive))
        }
    }
}

fn resolve_endpoint(config: &RunConfig) -> Result<&str, ConfigurationError> {
    config
        .cluster_endpoint
        .as_deref()
        .ok_or(ConfigurationError::MissingClusterEndpoint)
}
