use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use stampede_core::prelude::ExecutionId;
use stampede_runner::prelude::{run_campaign, RunLog};
use stampede_session::SshConnector;

mod cli;
mod config;

use cli::StampedeCli;
use config::HarnessRepoSection;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = StampedeCli::parse();

    let mut document = config::load_config(&cli.config_path)?;
    // CLI archive flags override whatever the document configures.
    if cli.ycsb_path.is_some() || cli.ycsb_tar_path.is_some() || cli.ycsb_remote_tar_path.is_some()
    {
        document.ycsb_repo = HarnessRepoSection {
            ycsb_path: cli.ycsb_path,
            ycsb_tar_path: cli.ycsb_tar_path,
            ycsb_remote_tar_path: cli.ycsb_remote_tar_path,
        };
    }
    let harness_source = document.ycsb_repo.harness_source()?;

    let credentials = config::load_credentials(&cli.credentials_path)?.into_credentials();

    std::fs::create_dir_all(&cli.report_path).with_context(|| {
        format!(
            "Could not create report directory {}",
            cli.report_path.display()
        )
    })?;

    let run_config = document.into_run_config(harness_source, cli.report_path.clone());

    let execution_id = ExecutionId::generate();
    let run_log = Arc::new(RunLog::create(&cli.report_path, &execution_id)?);
    log::info!("Streaming raw harness output to {}", run_log.path().display());

    run_campaign(
        Arc::new(SshConnector),
        &run_config,
        &credentials,
        &execution_id,
        &run_log,
    )
}
