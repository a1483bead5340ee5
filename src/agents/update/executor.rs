use crate::agents::package_manager::PackageManagerAgent;
use crate::agents::update::feedback::Reporter;
use crate::agents::update::outcome::UpdateOutcome;
use crate::agents::version_control::VersionControlAgent;
use crate::git::ParsedSource;
use crate::utils::CommandOutput;
use std::fmt;

/// States of one update attempt. Every state has a failure edge to `ExecutorFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStage {
    Start,
    Fetched,
    CheckedOut,
    Cleaned,
    DependenciesInstalled,
    Done,
}

impl fmt::Display for ExecutorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutorStage::Start => "start",
            ExecutorStage::Fetched => "fetched",
            ExecutorStage::CheckedOut => "checked out",
            ExecutorStage::Cleaned => "cleaned",
            ExecutorStage::DependenciesInstalled => "dependencies installed",
            ExecutorStage::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorFailure {
    Fetch(String),
    Checkout(String),
    Clean(String),
    Install(String),
}

impl ExecutorFailure {
    pub fn into_outcome(self, tag: &str) -> UpdateOutcome {
        let tag = tag.to_string();
        match self {
            ExecutorFailure::Fetch(reason) => UpdateOutcome::FetchFailed { reason },
            ExecutorFailure::Checkout(reason) => UpdateOutcome::CheckoutFailed { tag, reason },
            ExecutorFailure::Clean(reason) => UpdateOutcome::CleanFailed { tag, reason },
            ExecutorFailure::Install(reason) => UpdateOutcome::InstallFailed { tag, reason },
        }
    }
}

/// Drives fetch, checkout, optional clean and dependency install for one extension.
///
/// Runs each step at most once and stops at the first failure.
pub struct UpdateExecutor<'a> {
    vcs: &'a VersionControlAgent,
    packages: &'a PackageManagerAgent,
    clean: bool,
}

impl<'a> UpdateExecutor<'a> {
    pub fn new(vcs: &'a VersionControlAgent, packages: &'a PackageManagerAgent, clean: bool) -> Self {
        Self {
            vcs,
            packages,
            clean,
        }
    }

    pub fn execute(
        &self,
        source: &ParsedSource,
        tag: &str,
        reporter: &mut Reporter<'_>,
    ) -> Result<ExecutorStage, ExecutorFailure> {
        let mut stage = ExecutorStage::Start;

        reporter.detail(&format!("fetching tags from {}...", source.display_address()));
        let output = self
            .vcs
            .fetch_tags(source)
            .map_err(|e| ExecutorFailure::Fetch(e.to_string()))?;
        stage = Self::advance(stage, ExecutorStage::Fetched, "git fetch", &output, reporter);

        reporter.detail(&format!("checking out {tag}..."));
        let output = self
            .vcs
            .checkout_tag(tag)
            .map_err(|e| ExecutorFailure::Checkout(e.to_string()))?;
        stage = Self::advance(stage, ExecutorStage::CheckedOut, "git checkout", &output, reporter);

        if self.clean {
            reporter.detail("removing untracked files...");
            let output = self
                .vcs
                .clean_untracked()
                .map_err(|e| ExecutorFailure::Clean(e.to_string()))?;
            stage = Self::advance(stage, ExecutorStage::Cleaned, "git clean", &output, reporter);
        }

        let command = self.packages.install_command_line();
        reporter.detail(&format!("installing dependencies ({command})..."));
        let output = self
            .packages
            .install_dependencies()
            .map_err(|e| ExecutorFailure::Install(e.to_string()))?;
        stage = Self::advance(
            stage,
            ExecutorStage::DependenciesInstalled,
            &command,
            &output,
            reporter,
        );

        Ok(Self::advance(
            stage,
            ExecutorStage::Done,
            "",
            &CommandOutput::default(),
            reporter,
        ))
    }

    fn advance(
        from: ExecutorStage,
        to: ExecutorStage,
        command: &str,
        output: &CommandOutput,
        reporter: &mut Reporter<'_>,
    ) -> ExecutorStage {
        reporter.trace_output(command, &output.stdout);
        reporter.trace_output(command, &output.stderr);
        reporter.trace(&format!("{from} -> {to}"));
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::package_manager::DEFAULT_INSTALL_COMMAND;
    use crate::agents::update::feedback::testing::RecordingSink;
    use crate::utils::command::testing::ScriptedRunner;
    use crate::utils::CommandRunner;
    use std::sync::Arc;

    fn source() -> ParsedSource {
        ParsedSource::parse("git+ssh://git@host.example:/srv/git/ext.git#semver:^1.0.0").unwrap()
    }

    fn run(runner: Arc<ScriptedRunner>, clean: bool) -> Result<ExecutorStage, ExecutorFailure> {
        let shared: Arc<dyn CommandRunner> = runner;
        let vcs = VersionControlAgent::new(shared.clone(), "/ext/demo");
        let install: Vec<String> = DEFAULT_INSTALL_COMMAND.iter().map(|s| s.to_string()).collect();
        let packages = PackageManagerAgent::new(shared, "/ext/demo", &install);
        let mut sink = RecordingSink::default();
        let mut reporter = Reporter::new("demo", &mut sink);
        UpdateExecutor::new(&vcs, &packages, clean).execute(&source(), "1.2.0", &mut reporter)
    }

    #[test]
    fn runs_full_sequence_in_order() {
        let runner = Arc::new(ScriptedRunner::new());
        let stage = run(runner.clone(), true).unwrap();

        assert_eq!(stage, ExecutorStage::Done);
        assert_eq!(
            runner.commands(),
            vec![
                "git fetch --tags git@host.example:/srv/git/ext.git",
                "git checkout refs/tags/1.2.0",
                "git clean -f -d",
                "npm install",
            ]
        );
    }

    #[test]
    fn clean_is_skipped_unless_enabled() {
        let runner = Arc::new(ScriptedRunner::new());
        run(runner.clone(), false).unwrap();
        assert!(!runner.ran("git clean"));
        assert!(runner.ran("npm install"));
    }

    #[test]
    fn checkout_failure_stops_before_clean_and_install() {
        let runner = Arc::new(ScriptedRunner::new().respond(
            "git checkout",
            CommandOutput::failed(1, "error: Your local changes would be overwritten"),
        ));

        let failure = run(runner.clone(), true).unwrap_err();

        assert!(matches!(failure, ExecutorFailure::Checkout(_)));
        assert_eq!(failure.clone().into_outcome("1.0.0").status_code(), 11);
        assert!(runner.ran("git fetch"));
        assert!(!runner.ran("git clean"));
        assert!(!runner.ran("npm"));
    }

    #[test]
    fn fetch_failure_stops_immediately() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("git fetch", CommandOutput::failed(128, "fatal: no route")),
        );

        let failure = run(runner.clone(), false).unwrap_err();

        assert_eq!(failure.clone().into_outcome("1.0.0").status_code(), 10);
        assert_eq!(runner.commands().len(), 1);
    }

    #[test]
    fn install_failure_maps_to_partial_update() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("npm", CommandOutput::failed(1, "npm ERR! ETARGET")),
        );

        let outcome = run(runner, false).unwrap_err().into_outcome("1.2.0");

        assert!(matches!(outcome, UpdateOutcome::InstallFailed { ref tag, .. } if tag == "1.2.0"));
        assert!(outcome.changed_checkout());
    }

    #[test]
    fn clean_failure_has_its_own_code() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("git clean", CommandOutput::failed(1, "permission denied")),
        );
        let failure = run(runner.clone(), true).unwrap_err();
        assert_eq!(failure.clone().into_outcome("1.0.0").status_code(), 12);
        assert!(!runner.ran("npm"));
    }
}
