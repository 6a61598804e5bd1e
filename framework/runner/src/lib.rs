mod config;
mod coordinator;
mod phase;
mod provision;
mod run_log;

pub mod prelude {
    pub use crate::config::{DataParams, HarnessSource, RunConfig, ThreadCounts};
    pub use crate::coordinator::run_campaign;
    pub use crate::phase::{run_phase, BASELINE_WORKLOAD};
    pub use crate::provision::{provision, ResolvedArchive};
    pub use crate::run_log::RunLog;
}
