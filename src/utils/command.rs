use crate::error::{ExtMgrError, Result};
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Build a successful output for scripted runners.
    #[cfg(test)]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Short, single-line description of why the command failed.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        let detail = if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        };
        let status = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };

        if detail.is_empty() {
            status
        } else {
            format!("{status}: {}", detail.lines().last().unwrap_or(detail))
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs external programs with an argument vector inside a working directory.
///
/// Arguments are never joined into a shell string.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        debug!(program, args = ?args, cwd = %cwd.display(), "running command");

        let output = Command::new(program)
            .current_dir(cwd)
            .args(args)
            .output()
            .map_err(|e| ExtMgrError::CommandSpawn {
                program: format!("{} {}", program, args.join(" ")),
                reason: e.to_string(),
            })?;

        let output = CommandOutput::from(output);
        debug!(program, code = ?output.code, success = output.success, "command finished");
        Ok(output)
    }
}
