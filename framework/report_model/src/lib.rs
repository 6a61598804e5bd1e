use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use stampede_core::prelude::{HostFailure, PartialFailure};

/// The two execution modes of the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    /// Writes the fixed baseline dataset once.
    Load,
    /// Runs a named workload against already-loaded data.
    Query,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Load => "load",
            PhaseKind::Query => "query",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one phase on one client host.
///
/// Either the harness ran to completion and `metrics` holds the summary values
/// parsed from its output, or the host failed and `failure` records why. A
/// failed host always carries an empty metric mapping. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostResult {
    /// The address of the client host that produced this result.
    pub host: String,
    /// Summary metric name to value, as reported by the harness.
    pub metrics: BTreeMap<String, String>,
    /// Why this host's phase failed, if it did.
    pub failure: Option<String>,
}

impl HostResult {
    pub fn success(host: impl Into<String>, metrics: BTreeMap<String, String>) -> Self {
        Self {
            host: host.into(),
            metrics,
            failure: None,
        }
    }

    pub fn failed(host: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            metrics: BTreeMap::new(),
            failure: Some(cause.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// All host results for one (phase, workload) pair.
///
/// Created when the phase finishes, written to disk exactly once and immutable
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseReport {
    pub phase: PhaseKind,
    pub workload: String,
    pub results: Vec<HostResult>,
}

impl PhaseReport {
    pub fn new(phase: PhaseKind, workload: impl Into<String>, results: Vec<HostResult>) -> Self {
        Self {
            phase,
            workload: workload.into(),
            results,
        }
    }

    /// The file name this report is stored under in the report directory.
    pub fn file_name(&self, execution_id: &str) -> String {
        format!("{execution_id}_{}_{}.json", self.phase, self.workload)
    }

    /// Derive the aggregate failure for this phase, if any host failed.
    pub fn partial_failure(&self) -> Option<PartialFailure> {
        PartialFailure::from_failures(
            self.results
                .iter()
                .filter_map(|r| {
                    r.failure.as_ref().map(|cause| HostFailure {
                        host: r.host.clone(),
                        error: cause.clone(),
                    })
                })
                .collect(),
        )
    }
}

/// Write the report as JSON to `path`.
///
/// Each report file is written exactly once, after every host worker for the
/// phase has returned.
pub fn write_report(report: &PhaseReport, path: &Path) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(&mut file, report)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Load a report previously written with [write_report].
pub fn load_report(path: &Path) -> anyhow::Result<PhaseReport> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let report: PhaseReport = serde_json::from_reader(reader)?;
    Ok(report)
}
