use crate::error::{ExtMgrError, Result};
use crate::git::{ParsedSource, parse_ls_remote};
use crate::utils::{CommandOutput, CommandRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// VersionControlAgent runs the git commands needed to inspect and move an extension checkout.
pub struct VersionControlAgent {
    runner: Arc<dyn CommandRunner>,
    work_dir: PathBuf,
}

impl VersionControlAgent {
    pub fn new<P: AsRef<Path>>(runner: Arc<dyn CommandRunner>, work_dir: P) -> Self {
        Self {
            runner,
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Tags pointing at the current HEAD. Empty when the checkout sits on an untagged commit.
    pub fn installed_tags(&self) -> Result<Vec<String>> {
        let output = self.run_git(&["tag", "--points-at", "HEAD"])?;
        Self::ensure_success(&output, "git tag --points-at HEAD")?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Annotated tags advertised by the remote, in the order git lists them.
    pub fn list_remote_tags(&self, source: &ParsedSource) -> Result<Vec<String>> {
        let output = self.run_git(&["ls-remote", "--tags", source.address()])?;
        Self::ensure_success(&output, "git ls-remote --tags")?;
        Ok(parse_ls_remote(&output.stdout))
    }

    pub fn fetch_tags(&self, source: &ParsedSource) -> Result<CommandOutput> {
        let output = self.run_git(&["fetch", "--tags", source.address()])?;
        Self::ensure_success(&output, "git fetch --tags")?;
        Ok(output)
    }

    pub fn checkout_tag(&self, tag: &str) -> Result<CommandOutput> {
        let reference = format!("refs/tags/{tag}");
        let output = self.run_git(&["checkout", &reference])?;
        Self::ensure_success(&output, "git checkout")?;
        Ok(output)
    }

    /// Force-removes untracked files and directories.
    pub fn clean_untracked(&self) -> Result<CommandOutput> {
        let output = self.run_git(&["clean", "-f", "-d"])?;
        Self::ensure_success(&output, "git clean")?;
        Ok(output)
    }

    fn run_git(&self, args: &[&str]) -> Result<CommandOutput> {
        self.runner.run("git", args, &self.work_dir)
    }

    fn ensure_success(output: &CommandOutput, command: &str) -> Result<()> {
        if output.success {
            return Ok(());
        }

        Err(ExtMgrError::VersionControl(format!(
            "{} failed: {}",
            command,
            output.failure_reason()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::testing::ScriptedRunner;

    fn source() -> ParsedSource {
        ParsedSource::parse("git+ssh://git@host.example:/srv/git/ext.git#semver:latest").unwrap()
    }

    #[test]
    fn installed_tags_splits_lines() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("git tag --points-at HEAD", CommandOutput::ok("1.0.0\nv1.0.0\n")),
        );
        let agent = VersionControlAgent::new(runner.clone(), "/ext/demo");

        assert_eq!(agent.installed_tags().unwrap(), vec!["1.0.0", "v1.0.0"]);
        assert_eq!(runner.calls()[0].cwd, PathBuf::from("/ext/demo"));
    }

    #[test]
    fn untagged_head_has_no_installed_tags() {
        let runner = Arc::new(ScriptedRunner::new());
        let agent = VersionControlAgent::new(runner, "/ext/demo");
        assert!(agent.installed_tags().unwrap().is_empty());
    }

    #[test]
    fn remote_tags_use_the_derived_address() {
        let runner = Arc::new(ScriptedRunner::new().respond(
            "git ls-remote",
            CommandOutput::ok("abc\trefs/tags/1.1.0^{}\n"),
        ));
        let agent = VersionControlAgent::new(runner.clone(), "/ext/demo");

        assert_eq!(agent.list_remote_tags(&source()).unwrap(), vec!["1.1.0"]);
        assert_eq!(
            runner.commands(),
            vec!["git ls-remote --tags git@host.example:/srv/git/ext.git"]
        );
    }

    #[test]
    fn failing_ls_remote_is_an_error() {
        let runner = Arc::new(ScriptedRunner::new().respond(
            "git ls-remote",
            CommandOutput::failed(128, "fatal: Could not read from remote repository."),
        ));
        let agent = VersionControlAgent::new(runner, "/ext/demo");

        let err = agent.list_remote_tags(&source()).unwrap_err();
        assert!(matches!(err, ExtMgrError::VersionControl(_)));
        assert!(err.to_string().contains("Could not read from remote"));
    }

    #[test]
    fn checkout_uses_fully_qualified_tag() {
        let runner = Arc::new(ScriptedRunner::new());
        let agent = VersionControlAgent::new(runner.clone(), "/ext/demo");
        agent.checkout_tag("v2.0.0").unwrap();
        assert_eq!(runner.commands(), vec!["git checkout refs/tags/v2.0.0"]);
    }
}
