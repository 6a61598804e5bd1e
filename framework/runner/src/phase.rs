use std::collections::BTreeMap;
use std::sync::Arc;

use stampede_core::prelude::{
    ensure_shell_safe, ConfigurationError, Credentials, ExecutionId, SessionError,
};
use stampede_report_model::{HostResult, PhaseKind, PhaseReport};
use stampede_session::{Connector, RemoteSession};

use crate::config::RunConfig;
use crate::run_log::RunLog;

/// The load phase always writes this workload's dataset, regardless of which
/// query workloads are configured. Loading once keeps the dataset size stable
/// across read-only workload runs.
pub const BASELINE_WORKLOAD: &str = "workloada";

/// Harness output lines worth surfacing to the operational log as they stream.
const PROGRESS_MARKERS: [&str; 2] = ["est completion in", "Return="];

/// Marks the summary lines that carry per-run metrics.
const OVERALL_MARKER: &str = "[OVERALL]";

/// Execute one phase on every client host, one worker per host.
///
/// Hosts run independently; a failing host never aborts its siblings, and the
/// overall outcome is only decided once every worker has returned. The report
/// always contains exactly one [HostResult] per input host. Failed hosts carry
/// an empty metric mapping and a failure cause; use
/// [PhaseReport::partial_failure] to surface them.
#[allow(clippy::too_many_arguments)]
pub fn run_phase<C: Connector>(
    connector: &Arc<C>,
    hosts: &[String],
    endpoint: &str,
    workload: &str,
    phase: PhaseKind,
    config: &RunConfig,
    credentials: &Credentials,
    execution_id: &ExecutionId,
    run_log: &Arc<RunLog>,
) -> Result<PhaseReport, ConfigurationError> {
    // The load phase targets the fixed baseline workload no matter what the
    // caller passes.
    let workload = match phase {
        PhaseKind::Load => BASELINE_WORKLOAD,
        PhaseKind::Query => workload,
    };
    let command = harness_command(endpoint, workload, phase, config, execution_id)?;

    let mut workers = Vec::with_capacity(hosts.len());
    for host in hosts {
        let connector = connector.clone();
        let host = host.clone();
        let command = command.clone();
        let credentials = credentials.clone();
        let run_log = run_log.clone();
        let endpoint = endpoint.to_string();

        let worker_host = host.clone();
        let handle = std::thread::Builder::new()
            .name(format!("{phase}-{host}"))
            .spawn(move || {
                log::info!("Running {phase} phase from {worker_host} against {endpoint}");
                let result = run_phase_host(
                    connector.as_ref(),
                    &worker_host,
                    &command,
                    &credentials,
                    &run_log,
                );
                log::info!("{phase} phase from {worker_host} against {endpoint} terminated");
                result
            })
            .expect("Failed to spawn phase thread");
        workers.push((host, handle));
    }

    let results = workers
        .into_iter()
        .map(|(host, handle)| {
            handle
                .join()
                .unwrap_or_else(|_| HostResult::failed(host, "phase worker panicked"))
        })
        .collect();

    Ok(PhaseReport::new(phase, workload, results))
}

fn run_phase_host<C: Connector>(
    connector: &C,
    host: &str,
    command: &str,
    credentials: &Credentials,
    run_log: &RunLog,
) -> HostResult {
    let mut session = match connector.connect(host, credentials) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Could not reach {host}: {e}");
            return HostResult::failed(host, e.to_string());
        }
    };

    let outcome = stream_harness(&mut session, host, command, run_log);
    if let Err(e) = session.close() {
        log::warn!("Failed to close session for {host}: {e}");
    }

    match outcome {
        Ok(metrics) => HostResult::success(host, metrics),
        Err(e) => {
            log::error!("Benchmark failed on {host}: {e}");
            HostResult::failed(host, e.to_string())
        }
    }
}

/// Run the harness command and drain its output.
///
/// Every stdout line goes verbatim to the shared run log, progress lines are
/// surfaced with the host identity, and `[OVERALL]` summary lines are parsed
/// into the metric mapping. Stderr is drained after stdout completes; any
/// stderr output fails the host for this phase, as does a non-zero exit
/// status. The command template redirects harness stderr into the stdout
/// stream, so the exit status is the primary failure signal here.
fn stream_harness<S: RemoteSession + ?Sized>(
    session: &mut S,
    host: &str,
    command: &str,
    run_log: &RunLog,
) -> Result<BTreeMap<String, String>, SessionError> {
    log::debug!("Command for {host}: {command}");

    let mut harness = session.run(command)?;
    let mut metrics = BTreeMap::new();
    harness.drain_stdout(&mut |line| {
        if PROGRESS_MARKERS.iter().any(|marker| line.contains(marker)) {
            log::info!("{host}: {}", line.trim_end());
        }
        if let Some((name, value)) = parse_overall_metric(line) {
            metrics.insert(name, value);
        }
        run_log.append_line(line);
    })?;

    let stderr = harness.drain_stderr()?;
    let status = harness.finish()?;
    if !stderr.trim().is_empty() {
        return Err(SessionError::RemoteCommand {
            host: host.to_string(),
            detail: format!("harness wrote to stderr:\n{}", stderr.trim()),
        });
    }
    if status != 0 {
        return Err(SessionError::RemoteCommand {
            host: host.to_string(),
            detail: format!("harness exited with status {status}"),
        });
    }

    Ok(metrics)
}

/// Parse a summary metric from an `[OVERALL]` line.
///
/// The metric name and value are the last two comma-separated fields after the
/// marker. Lines without the marker contribute nothing.
fn parse_overall_metric(line: &str) -> Option<(String, String)> {
    let (_, rest) = line.split_once(OVERALL_MARKER)?;
    let mut fields = rest.rsplit(',');
    let value = fields.next()?.trim();
    let name = fields.next()?.trim();
    if name.is_empty() || value.is_empty() {
        return None;
    }

    Some((name.to_string(), value.to_string()))
}

/// Build the remote harness invocation from its named fields.
///
/// User-controlled fields are validated before substitution; numeric fields
/// and execution-id-derived fields cannot carry shell metacharacters.
fn harness_command(
    endpoint: &str,
    workload: &str,
    phase: PhaseKind,
    config: &RunConfig,
    execution_id: &ExecutionId,
) -> Result<String, ConfigurationError> {
    ensure_shell_safe("workload id", workload)?;
    ensure_shell_safe("cluster endpoint", endpoint)?;

    let verb = match phase {
        PhaseKind::Load => "load",
        PhaseKind::Query => "run",
    };
    let threads = match phase {
        PhaseKind::Load => config.threads.load,
        PhaseKind::Query => config.threads.run,
    };
    let data = &config.data;
    let remote_root = execution_id.remote_root();

    Ok(format!(
        "cd {harness_dir}; \
         bash -l -c \"./bin/ycsb {verb} db \
         -P workloads/{workload} -s \
         -threads {threads} \
         -p db.endpoint={endpoint} \
         -p db.keyspace={keyspace} \
         -p recordcount={records} \
         -p operationcount={operations} \
         -p fieldcount={fieldcount} \
         -p fieldlength={fieldlength} \
         -p hdrhistogram.fileoutput=true \
         -p hdrhistogram.output.path={remote_root}/hist.log \
         2>&1 | tee {remote_root}/benchmark.log\"",
        harness_dir = execution_id.harness_dir(),
        keyspace = execution_id.keyspace(),
        records = data.records,
        operations = data.operations,
        fieldcount = data.fieldcount,
        fieldlength = data.fieldlength,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataParams, HarnessSource, RunConfig, ThreadCounts};
    use pretty_assertions::assert_eq;

    fn sample_config() -> RunConfig {
        RunConfig {
            cluster_endpoint: Some("db:9000".to_string()),
            cluster_sizes: vec![3],
            client_hosts: vec!["h1".to_string()],
            data: DataParams {
                records: 1000,
                operations: 5000,
                fieldcount: 10,
                fieldlength: 100,
                load: true,
                workloads: vec!["workloada".to_string()],
            },
            threads: ThreadCounts { load: 8, run: 16 },
            harness_source: HarnessSource::RemoteStaged("/opt/harness.tar.gz".to_string()),
            report_dir: "/tmp/reports".into(),
        }
    }

    #[test]
    fn parses_the_last_two_fields_of_an_overall_line() {
        let line = "2026-08-25 10:00:01:123 [OVERALL], Throughput(ops/sec), 1234.5";

        assert_eq!(
            parse_overall_metric(line),
            Some(("Throughput(ops/sec)".to_string(), "1234.5".to_string()))
        );
    }

    #[test]
    fn lines_without_the_marker_contribute_no_metric() {
        assert_eq!(parse_overall_metric("[READ], AverageLatency(us), 312.4"), None);
        assert_eq!(parse_overall_metric("plain progress output"), None);
    }

    #[test]
    fn malformed_overall_lines_are_skipped() {
        assert_eq!(parse_overall_metric("[OVERALL]"), None);
        assert_eq!(parse_overall_metric("[OVERALL], only-one-field"), None);
        assert_eq!(parse_overall_metric("[OVERALL], , "), None);
    }

    #[test]
    fn load_and_query_differ_in_verb_and_thread_count() {
        let config = sample_config();
        let id = ExecutionId::from_token("run_1");

        let load = harness_command("db:9000", "workloada", PhaseKind::Load, &config, &id).unwrap();
        let query = harness_command("db:9000", "workloadc", PhaseKind::Query, &config, &id).unwrap();

        assert!(load.contains("./bin/ycsb load db"));
        assert!(load.contains("-threads 8"));
        assert!(query.contains("./bin/ycsb run db"));
        assert!(query.contains("-threads 16"));
        assert!(query.contains("-P workloads/workloadc"));
    }

    #[test]
    fn command_is_namespaced_by_execution_id() {
        let config = sample_config();
        let id = ExecutionId::from_token("run_1");

        let command =
            harness_command("db:9000", "workloada", PhaseKind::Query, &config, &id).unwrap();

        assert!(command.contains("cd /tmp/run_1/harness;"));
        assert!(command.contains("-p db.keyspace=ks_run_1"));
        assert!(command.contains("-p hdrhistogram.output.path=/tmp/run_1/hist.log"));
    }

    #[test]
    fn rejects_a_workload_id_with_shell_metacharacters() {
        let config = sample_config();
        let id = ExecutionId::from_token("run_1");

        let err = harness_command(
            "db:9000",
            "workloada; rm -rf /",
            PhaseKind::Query,
            &config,
            &id,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigurationError::UnsafeField { .. }));
    }
}
