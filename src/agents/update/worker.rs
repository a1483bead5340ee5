use crate::agents::update::feedback::{FeedbackSink, Reporter};
use crate::agents::update::orchestrator::{ExtensionUpdater, UpdateRequest, report_outcome};
use crate::agents::update::outcome::UpdateOutcome;
use crate::error::{ExtMgrError, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Prefix of the final stdout line a worker prints, followed by the outcome as JSON.
pub const OUTCOME_PREFIX: &str = "outcome:";

/// Subcommand name of the worker entry point.
pub const WORKER_SUBCOMMAND: &str = "update-extension";

pub fn format_outcome_line(outcome: &UpdateOutcome) -> Result<String> {
    Ok(format!("{OUTCOME_PREFIX}{}", serde_json::to_string(outcome)?))
}

#[derive(Debug, PartialEq, Eq)]
enum WorkerLine {
    Outcome(UpdateOutcome),
    Message(String),
}

fn parse_worker_line(name: &str, line: &str) -> WorkerLine {
    if let Some(json) = line.strip_prefix(OUTCOME_PREFIX) {
        if let Ok(outcome) = serde_json::from_str(json) {
            return WorkerLine::Outcome(outcome);
        }
    }

    let tag = format!("[{name}]:");
    WorkerLine::Message(line.strip_prefix(&tag).unwrap_or(line).to_string())
}

/// Runs each extension in a child process of this same binary, one at a time.
///
/// The child gets an argument vector, never a shell string.
pub struct WorkerProcessUpdater {
    program: PathBuf,
    install_command: Vec<String>,
}

impl WorkerProcessUpdater {
    pub fn new(program: PathBuf, install_command: Vec<String>) -> Self {
        Self {
            program,
            install_command,
        }
    }

    pub fn current_exe(install_command: Vec<String>) -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| ExtMgrError::CommandSpawn {
            program: "pvtextmgr".to_string(),
            reason: format!("cannot locate own executable: {e}"),
        })?;
        Ok(Self::new(program, install_command))
    }

    fn worker_args(&self, request: &UpdateRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "-vvv".to_string(),
            WORKER_SUBCOMMAND.to_string(),
            request.name.to_string(),
            request.install_root.display().to_string(),
            request.source.to_string(),
            request.clean.to_string(),
        ];
        if !self.install_command.is_empty() {
            args.push("--install-command".to_string());
            args.extend(self.install_command.iter().cloned());
        }
        args
    }

    fn run_worker(
        &self,
        request: &UpdateRequest<'_>,
        reporter: &mut Reporter<'_>,
    ) -> Result<UpdateOutcome> {
        let args = self.worker_args(request);
        debug!(program = %self.program.display(), args = ?args, "spawning worker");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtMgrError::CommandSpawn {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        // Drain stderr on its own thread so a chatty worker cannot block on a full pipe.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buffer = String::new();
                let _ = stderr.read_to_string(&mut buffer);
                buffer
            })
        });

        let mut outcome = None;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                match parse_worker_line(request.name, &line) {
                    WorkerLine::Outcome(parsed) => outcome = Some(parsed),
                    WorkerLine::Message(message) => reporter.detail(&message),
                }
            }
        }

        let status = child.wait()?;
        if let Some(handle) = stderr_reader {
            let stderr = handle.join().unwrap_or_default();
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                reporter.trace(line);
            }
        }

        Ok(outcome.unwrap_or_else(|| {
            let code = status.code().unwrap_or(-1);
            UpdateOutcome::from_status_code(
                code,
                format!("worker exited with status {code} without reporting an outcome"),
            )
        }))
    }
}

impl ExtensionUpdater for WorkerProcessUpdater {
    fn update(
        &mut self,
        request: &UpdateRequest<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> UpdateOutcome {
        let mut reporter = Reporter::new(request.name, sink);
        let outcome = self
            .run_worker(request, &mut reporter)
            .unwrap_or_else(|e| UpdateOutcome::Unknown {
                reason: e.to_string(),
            });
        report_outcome(&mut reporter, request.name, &outcome);
        outcome
    }
}
