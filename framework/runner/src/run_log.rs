use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use stampede_core::prelude::ExecutionId;

/// The per-run raw log file, shared by every host worker.
///
/// Every line of harness output is appended verbatim, so output from
/// concurrent hosts interleaves. Appends are line-atomic: each line is written
/// as a single call while holding the lock.
pub struct RunLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RunLog {
    /// Open the run log in the report directory, creating it if needed.
    pub fn create(report_dir: &Path, execution_id: &ExecutionId) -> anyhow::Result<Self> {
        let path = report_dir.join(format!("{execution_id}_benchmark.log"));
        let file = OpenOptions::new().append(true).create(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Append one line. Log I/O never fails a phase; a write error is
    /// reported to the operational log instead.
    pub fn append_line(&self, line: &str) {
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}") {
            log::warn!("Failed to append to run log {}: {e}", self.path.display());
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn concurrent_appends_stay_line_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(
            RunLog::create(dir.path(), &ExecutionId::from_token("test_run")).unwrap(),
        );

        let handles = (0..4)
            .map(|worker| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        log.append_line(&format!("worker-{worker} line-{i}"));
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 400);
        for line in lines {
            assert!(line.starts_with("worker-") && line.contains(" line-"));
        }
    }
}
