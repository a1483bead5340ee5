use crate::error::{ExtMgrError, Result};
use crate::utils::{CommandOutput, CommandRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_INSTALL_COMMAND: &[&str] = &["npm", "install"];

/// PackageManagerAgent installs an extension's dependencies from its package manifest
pub struct PackageManagerAgent {
    runner: Arc<dyn CommandRunner>,
    work_dir: PathBuf,
    install_command: Vec<String>,
}

impl PackageManagerAgent {
    pub fn new<P: AsRef<Path>>(
        runner: Arc<dyn CommandRunner>,
        work_dir: P,
        install_command: &[String],
    ) -> Self {
        Self {
            runner,
            work_dir: work_dir.as_ref().to_path_buf(),
            install_command: install_command.to_vec(),
        }
    }

    pub fn install_command_line(&self) -> String {
        self.install_command.join(" ")
    }

    /// Execute the dependency install command inside the extension directory
    pub fn install_dependencies(&self) -> Result<CommandOutput> {
        let (program, args) = self.install_command.split_first().ok_or_else(|| {
            ExtMgrError::Config("installCommand must name a program".to_string())
        })?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = self.runner.run(program, &args, &self.work_dir)?;
        if !output.success {
            return Err(ExtMgrError::CommandSpawn {
                program: self.install_command_line(),
                reason: output.failure_reason(),
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::testing::ScriptedRunner;

    fn default_command() -> Vec<String> {
        DEFAULT_INSTALL_COMMAND.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn runs_configured_command_in_extension_dir() {
        let runner = Arc::new(ScriptedRunner::new());
        let agent = PackageManagerAgent::new(runner.clone(), "/ext/demo", &default_command());

        agent.install_dependencies().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].command, "npm install");
        assert_eq!(calls[0].cwd, PathBuf::from("/ext/demo"));
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("npm", CommandOutput::failed(1, "npm ERR! missing script")),
        );
        let agent = PackageManagerAgent::new(runner, "/ext/demo", &default_command());

        let err = agent.install_dependencies().unwrap_err();
        assert!(err.to_string().contains("npm ERR! missing script"));
    }

    #[test]
    fn empty_command_is_a_configuration_error() {
        let runner = Arc::new(ScriptedRunner::new());
        let agent = PackageManagerAgent::new(runner, "/ext/demo", &[]);
        assert!(matches!(
            agent.install_dependencies().unwrap_err(),
            ExtMgrError::Config(_)
        ));
    }
}
