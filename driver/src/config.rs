use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use stampede_core::prelude::{ConfigurationError, Credentials};
use stampede_runner::prelude::{DataParams, HarnessSource, RunConfig, ThreadCounts};

/// The campaign configuration document, as stored on disk.
#[derive(Debug, Deserialize)]
pub struct ConfigDocument {
    pub cluster: ClusterSection,
    pub client: ClientSection,
    pub data: DataSection,
    pub threads: ThreadsSection,
    #[serde(default)]
    pub ycsb_repo: HarnessRepoSection,
}

#[derive(Debug, Deserialize)]
pub struct ClusterSection {
    pub url: Option<String>,
    pub size_list: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClientSection {
    pub url_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DataSection {
    pub records: u64,
    pub operations: u64,
    pub fieldcount: u32,
    pub fieldlength: u32,
    pub load: bool,
    pub workloads: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadsSection {
    pub load: u32,
    pub run: u32,
}

/// Where to find the harness distribution. The highest-precedence field that
/// is set wins: remote-staged, then local archive, then build tree.
#[derive(Debug, Default, Deserialize)]
pub struct HarnessRepoSection {
    pub ycsb_path: Option<PathBuf>,
    pub ycsb_tar_path: Option<PathBuf>,
    pub ycsb_remote_tar_path: Option<String>,
}

impl HarnessRepoSection {
    pub fn harness_source(&self) -> Result<HarnessSource, ConfigurationError> {
        if let Some(remote) = &self.ycsb_remote_tar_path {
            return Ok(HarnessSource::RemoteStaged(remote.clone()));
        }
        if let Some(archive) = &self.ycsb_tar_path {
            return Ok(HarnessSource::LocalArchive(archive.clone()));
        }
        if let Some(tree) = &self.ycsb_path {
            return Ok(HarnessSource::BuildTree(expand_home(tree)));
        }

        Err(ConfigurationError::MissingHarnessSource)
    }
}

/// Expand a leading `~` to the home directory, as config files routinely
/// point the build tree at a checkout under home.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

/// The credentials document, as stored on disk. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsDocument {
    #[serde(default)]
    pub ssh: SshSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct SshSection {
    pub key: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsDocument {
    pub fn into_credentials(self) -> Credentials {
        Credentials {
            key_path: self.ssh.key,
            username: self.ssh.username,
            password: self.ssh.password,
        }
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<ConfigDocument> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open configuration file {}", path.display()))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("Could not parse configuration file {}", path.display()))
}

pub fn load_credentials(path: &Path) -> anyhow::Result<CredentialsDocument> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open credentials file {}", path.display()))?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("Could not parse credentials file {}", path.display()))
}

impl ConfigDocument {
    /// Combine the document with CLI overrides into the immutable [RunConfig].
    pub fn into_run_config(
        self,
        harness_source: HarnessSource,
        report_dir: PathBuf,
    ) -> RunConfig {
        RunConfig {
            cluster_endpoint: self.cluster.url,
            cluster_sizes: self.cluster.size_list,
            client_hosts: self.client.url_list,
            data: DataParams {
                records: self.data.records,
                operations: self.data.operations,
                fieldcount: self.data.fieldcount,
                fieldlength: self.data.fieldlength,
                load: self.data.load,
                workloads: self.data.workloads,
            },
            threads: ThreadCounts {
                load: self.threads.load,
                run: self.threads.run,
            },
            harness_source,
            report_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_CONFIG: &str = r#"
cluster:
  url: "db:9000"
  size_list: [3, 5]
client:
  url_list: ["h1", "h2"]
data:
  records: 1000
  operations: 5000
  fieldcount: 10
  fieldlength: 100
  load: true
  workloads: ["workloada", "workloadc"]
threads:
  load: 8
  run: 16
ycsb_repo:
  ycsb_tar_path: "/tmp/harness.tar.gz"
"#;

    #[test]
    fn parses_a_full_document() {
        let doc: ConfigDocument = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

        assert_eq!(doc.cluster.url.as_deref(), Some("db:9000"));
        assert_eq!(doc.cluster.size_list, vec![3, 5]);
        assert_eq!(doc.client.url_list, vec!["h1", "h2"]);
        assert_eq!(doc.data.workloads, vec!["workloada", "workloadc"]);
        assert!(doc.data.load);
        assert_eq!(doc.threads.run, 16);
    }

    #[test]
    fn remote_staged_archive_takes_precedence() {
        let repo = HarnessRepoSection {
            ycsb_path: Some("/src/harness".into()),
            ycsb_tar_path: Some("/tmp/harness.tar.gz".into()),
            ycsb_remote_tar_path: Some("/opt/harness.tar.gz".to_string()),
        };

        assert!(matches!(
            repo.harness_source().unwrap(),
            HarnessSource::RemoteStaged(path) if path == "/opt/harness.tar.gz"
        ));
    }

    #[test]
    fn local_archive_beats_the_build_tree() {
        let repo = HarnessRepoSection {
            ycsb_path: Some("/src/harness".into()),
            ycsb_tar_path: Some("/tmp/harness.tar.gz".into()),
            ycsb_remote_tar_path: None,
        };

        assert!(matches!(
            repo.harness_source().unwrap(),
            HarnessSource::LocalArchive(path) if path == PathBuf::from("/tmp/harness.tar.gz")
        ));
    }

    #[test]
    fn build_tree_paths_under_home_are_expanded() {
        let repo = HarnessRepoSection {
            ycsb_path: Some("~/ycsb".into()),
            ycsb_tar_path: None,
            ycsb_remote_tar_path: None,
        };

        let HarnessSource::BuildTree(tree) = repo.harness_source().unwrap() else {
            panic!("expected a build tree source");
        };
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(tree, PathBuf::from(home).join("ycsb"));
        }
    }

    #[test]
    fn no_source_at_all_is_a_configuration_error() {
        let repo = HarnessRepoSection::default();

        assert!(matches!(
            repo.harness_source().unwrap_err(),
            ConfigurationError::MissingHarnessSource
        ));
    }

    #[test]
    fn missing_credentials_sections_default_to_none() {
        let doc: CredentialsDocument = serde_yaml::from_str("{}").unwrap();
        let credentials = doc.into_credentials();

        assert!(credentials.key_path.is_none());
        assert!(credentials.username.is_none());
        assert!(credentials.password.is_none());
    }

    #[test]
    fn credentials_document_round_trips() {
        let doc: CredentialsDocument = serde_yaml::from_str(
            r#"
ssh:
  username: "bench"
  password: "secret"
"#,
        )
        .unwrap();
        let credentials = doc.into_credentials();

        assert_eq!(credentials.username.as_deref(), Some("bench"));
        assert_eq!(credentials.password.as_deref(), Some("secret"));
        assert!(credentials.key_path.is_none());
    }
}
