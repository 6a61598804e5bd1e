use std::path::PathBuf;

/// Immutable configuration for one benchmark campaign.
///
/// Built once by the driver and handed down; nothing in the run mutates it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Endpoint of the target cluster. Instantiating a cluster is not
    /// implemented, so a missing endpoint is a fatal configuration error when
    /// the first phase is about to run.
    pub cluster_endpoint: Option<String>,
    /// Cluster sizes to iterate over. Sizing the cluster itself is out of
    /// scope; the size is carried through for reporting and sequencing.
    pub cluster_sizes: Vec<u32>,
    /// Addresses of the client hosts that drive load.
    pub client_hosts: Vec<String>,
    pub data: DataParams,
    pub threads: ThreadCounts,
    pub harness_source: HarnessSource,
    /// Local directory that receives the run log and phase reports.
    pub report_dir: PathBuf,
}

/// Data-generation parameters passed through to the harness.
#[derive(Debug, Clone)]
pub struct DataParams {
    pub records: u64,
    pub operations: u64,
    pub fieldcount: u32,
    pub fieldlength: u32,
    /// Whether to run the load phase before the query phases.
    pub load: bool,
    /// Workload ids to run query phases for.
    pub workloads: Vec<String>,
}

/// Harness thread counts, one per phase kind.
#[derive(Debug, Clone, Copy)]
pub struct ThreadCounts {
    pub load: u32,
    pub run: u32,
}

/// Where the harness distribution comes from.
///
/// Exactly one mode is active per run. The driver resolves the configured
/// fields with precedence remote-staged > local-archive > build-tree.
#[derive(Debug, Clone)]
pub enum HarnessSource {
    /// An archive already present at this path on every client host.
    RemoteStaged(String),
    /// A pre-built archive on the local machine, transferred to each host.
    LocalArchive(PathBuf),
    /// A local build tree to package into an archive first.
    BuildTree(PathBuf),
}
