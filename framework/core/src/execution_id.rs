use rand::Rng;
use std::fmt;

/// A run-scoped token that namespaces everything a run touches.
///
/// The id is derived from the local time the run started, plus a short random
/// suffix so that two runs started within the same second never collide. It is
/// used to name the remote working directory, the logical keyspace on the
/// target cluster and every report artifact produced by the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generate a fresh execution id from the current local time.
    pub fn generate() -> Self {
        let stamp = chrono::Local::now().format("%d%m%Y_%H%M%S");
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(4)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        Self(format!("{stamp}_{suffix}"))
    }

    /// Build an execution id from an existing token.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The directory on each client host that this run owns.
    pub fn remote_root(&self) -> String {
        format!("/tmp/{}", self.0)
    }

    /// Where the harness distribution is extracted on each client host.
    pub fn harness_dir(&self) -> String {
        format!("{}/harness", self.remote_root())
    }

    /// The logical keyspace on the target cluster that this run writes to.
    pub fn keyspace(&self) -> String {
        format!("ks_{}", self.0)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derives_namespaced_paths() {
        let id = ExecutionId::from_token("21082026_153000_ab12");

        assert_eq!(id.remote_root(), "/tmp/21082026_153000_ab12");
        assert_eq!(id.harness_dir(), "/tmp/21082026_153000_ab12/harness");
        assert_eq!(id.keyspace(), "ks_21082026_153000_ab12");
    }

    #[test]
    fn distinct_ids_never_share_a_namespace() {
        let a = ExecutionId::from_token("run_a");
        let b = ExecutionId::from_token("run_b");

        assert_ne!(a.remote_root(), b.remote_root());
        assert_ne!(a.harness_dir(), b.harness_dir());
        assert_ne!(a.keyspace(), b.keyspace());
    }

    #[test]
    fn generated_ids_are_unique_within_a_second() {
        let a = ExecutionId::generate();
        let b = ExecutionId::generate();

        assert_ne!(a, b);
    }
}
