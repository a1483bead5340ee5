use crate::agents::update::feedback::{Feedback, FeedbackSink};
use crate::agents::update::outcome::{BatchReport, UpdateOutcome};
use crate::error::{ExtMgrError, Result};
use jiff::Zoned;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only record of one batch run: start, each extension's completion, end.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Creates `pvtextmgr-YYYYmmdd-HHMMSS.log` inside `dir`, creating `dir` if needed.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            ExtMgrError::RunLog(format!("cannot create log directory {}: {}", dir.display(), e))
        })?;

        let name = format!("pvtextmgr-{}.log", Zoned::now().strftime("%Y%m%d-%H%M%S"));
        Self::open(&dir.join(name))
    }

    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ExtMgrError::RunLog(format!("cannot open {}: {}", path.display(), e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, text: &str) {
        let stamp = Zoned::now().strftime("%Y-%m-%dT%H:%M:%S%:z");
        if let Err(e) = writeln!(self.file, "{stamp} {text}") {
            warn!(path = %self.path.display(), error = %e, "failed to write run log");
        }
    }
}

impl FeedbackSink for RunLog {
    fn emit(&mut self, _feedback: &Feedback<'_>) {}

    fn run_started(&mut self, total: usize) {
        self.write_line(&format!("run started: {total} extension(s) configured"));
    }

    fn extension_finished(&mut self, extension: &str, outcome: &UpdateOutcome) {
        let mut line = format!(
            "[{extension}] {} (status {})",
            outcome.describe(extension),
            outcome.status_code()
        );
        if let Some(detail) = outcome.error_detail() {
            line.push_str(": ");
            line.push_str(detail);
        }
        self.write_line(&line);
    }

    fn run_finished(&mut self, report: &BatchReport) {
        let state = if report.cancelled { "cancelled" } else { "finished" };
        self.write_line(&format!(
            "run {state}: {}/{} processed, updated: {}",
            report.processed(),
            report.total,
            report.any_updated
        ));
    }
}
