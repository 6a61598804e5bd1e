use clap::Parser;
use std::path::PathBuf;

/// Drive a distributed benchmark campaign against a database cluster.
#[derive(Parser)]
#[command(about, long_about = None)]
pub struct StampedeCli {
    /// Path to the YAML file containing the campaign configuration
    #[clap(long, default_value = "config/ycsb_local.yml")]
    pub config_path: PathBuf,

    /// Path to the YAML file containing the SSH credentials
    #[clap(long, default_value = "config/credentials_example.yml")]
    pub credentials_path: PathBuf,

    /// Directory where the run log and phase reports are stored
    #[clap(long, default_value = "reports")]
    pub report_path: PathBuf,

    /// Path to a local harness build tree to package and distribute
    #[clap(long)]
    pub ycsb_path: Option<PathBuf>,

    /// Path to a pre-built local harness archive. Overrides --ycsb-path.
    #[clap(long)]
    pub ycsb_tar_path: Option<PathBuf>,

    /// Path to a harness archive already staged on every client host.
    /// Overrides --ycsb-path and --ycsb-tar-path.
    #[clap(long)]
    pub ycsb_remote_tar_path: Option<String>,
}
