use crate::agents::extension_scanner::ExtensionScannerAgent;
use crate::agents::package_manager::PackageManagerAgent;
use crate::agents::update::executor::UpdateExecutor;
use crate::agents::update::feedback::{FeedbackSink, Reporter};
use crate::agents::update::interaction::UpdateInteraction;
use crate::agents::update::outcome::UpdateOutcome;
use crate::agents::version_control::VersionControlAgent;
use crate::error::ExtMgrError;
use crate::git::ParsedSource;
use crate::utils::CommandRunner;
use crate::versioning::VersionResolver;
use std::path::Path;
use std::sync::Arc;

/// Everything needed to update one configured extension.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    pub name: &'a str,
    pub install_root: &'a Path,
    pub source: &'a str,
    pub clean: bool,
}

/// Updates a single extension and reports the outcome through the sink.
pub trait ExtensionUpdater {
    fn update(&mut self, request: &UpdateRequest<'_>, sink: &mut dyn FeedbackSink)
    -> UpdateOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Apply,
    /// Resolve only; never run the executor.
    CheckOnly,
}

/// In-process orchestrator: scan, parse, resolve, then execute when needed.
pub struct ExtensionOrchestrator {
    runner: Arc<dyn CommandRunner>,
    install_command: Vec<String>,
    mode: UpdateMode,
    interaction: UpdateInteraction,
}

impl ExtensionOrchestrator {
    pub fn new(runner: Arc<dyn CommandRunner>, install_command: Vec<String>) -> Self {
        Self {
            runner,
            install_command,
            mode: UpdateMode::Apply,
            interaction: UpdateInteraction::disabled(),
        }
    }

    pub fn with_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_interaction(mut self, interaction: UpdateInteraction) -> Self {
        self.interaction = interaction;
        self
    }

    fn resolve_and_update(
        &mut self,
        request: &UpdateRequest<'_>,
        reporter: &mut Reporter<'_>,
    ) -> UpdateOutcome {
        let name = request.name;
        reporter.detail("update started...");

        let scanner = ExtensionScannerAgent::new(request.install_root);
        let info = match scanner.locate(name) {
            Ok(Some(info)) => info,
            Ok(None) => {
                return UpdateOutcome::NotFound {
                    path: request.install_root.join(name),
                };
            }
            Err(e) => {
                return UpdateOutcome::ParseFailed {
                    reason: e.to_string(),
                };
            }
        };
        reporter.detail("extension exists...");
        if !info.has_git {
            reporter.trace("no .git directory found; git commands are likely to fail");
        }
        if !info.has_manifest {
            reporter.trace("no package.json found");
        }

        let source = match ParsedSource::parse(request.source) {
            Ok(source) => source,
            Err(e) => {
                return UpdateOutcome::ParseFailed {
                    reason: e.to_string(),
                };
            }
        };

        let vcs = VersionControlAgent::new(self.runner.clone(), &info.path);
        let installed = vcs.installed_tags().unwrap_or_else(|e| {
            reporter.trace(&format!("could not read installed tag: {e}"));
            Vec::new()
        });
        match installed.as_slice() {
            [] => reporter.trace("no tag points at HEAD"),
            tags => reporter.trace(&format!("installed tag(s): {}", tags.join(", "))),
        }

        let Some(selector) = source.selector.clone() else {
            reporter.status("source has no #semver: selector; leaving it alone");
            return UpdateOutcome::Unmanaged;
        };

        reporter.detail("checking semver...");
        let tags = match vcs.list_remote_tags(&source) {
            Ok(tags) => tags,
            Err(e) => {
                return UpdateOutcome::ListFailed {
                    reason: e.to_string(),
                };
            }
        };
        reporter.trace(&format!(
            "{} remote tag(s) at {}",
            tags.len(),
            source.display_address()
        ));

        let Some(target) = VersionResolver::resolve(&selector, &tags) else {
            return UpdateOutcome::NoMatchingVersion {
                selector: selector.to_string(),
            };
        };

        if installed.iter().any(|tag| *tag == target) {
            return UpdateOutcome::UpToDate { tag: target };
        }

        let from = installed.first().cloned();
        reporter.status(&format!("`{name}` needs updating... ({target})"));

        if self.mode == UpdateMode::CheckOnly {
            return UpdateOutcome::UpdateAvailable { from, to: target };
        }

        match self.interaction.approve(name, from.as_deref(), &target) {
            Ok(true) => {}
            Ok(false) | Err(ExtMgrError::UserCancelled) => {
                return UpdateOutcome::Declined { to: target };
            }
            Err(e) => {
                return UpdateOutcome::Unknown {
                    reason: e.to_string(),
                };
            }
        }

        let packages = PackageManagerAgent::new(self.runner.clone(), &info.path, &self.install_command);
        let executor = UpdateExecutor::new(&vcs, &packages, request.clean);
        match executor.execute(&source, &target, reporter) {
            Ok(_) => UpdateOutcome::Updated { from, to: target },
            Err(failure) => failure.into_outcome(&target),
        }
    }
}

impl ExtensionUpdater for ExtensionOrchestrator {
    fn update(
        &mut self,
        request: &UpdateRequest<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> UpdateOutcome {
        let mut reporter = Reporter::new(request.name, sink);
        let outcome = self.resolve_and_update(request, &mut reporter);
        report_outcome(&mut reporter, request.name, &outcome);
        outcome
    }
}

/// Emits the final message for an outcome at its severity.
pub fn report_outcome(reporter: &mut Reporter<'_>, name: &str, outcome: &UpdateOutcome) {
    let message = outcome.describe(name);
    match outcome.error_detail() {
        Some(error) => reporter.emit_error(outcome.severity(), &message, error),
        None => reporter.emit(outcome.severity(), &message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::package_manager::DEFAULT_INSTALL_COMMAND;
    use crate::agents::update::feedback::Severity;
    use crate::agents::update::feedback::testing::RecordingSink;
    use crate::utils::CommandOutput;
    use crate::utils::command::testing::ScriptedRunner;
    use std::fs;
    use tempfile::TempDir;

    const SOURCE: &str = "git+ssh://git@host.example:/srv/git/demo.git#semver:^1.0.0";

    fn ls_remote(tags: &[&str]) -> CommandOutput {
        let body: String = tags
            .iter()
            .map(|t| format!("0000\trefs/tags/{t}\n0000\trefs/tags/{t}^{{}}\n"))
            .collect();
        CommandOutput::ok(body)
    }

    fn install_root_with(name: &str) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(name).join(".git")).unwrap();
        root
    }

    fn orchestrator(runner: &Arc<ScriptedRunner>) -> ExtensionOrchestrator {
        let install = DEFAULT_INSTALL_COMMAND.iter().map(|s| s.to_string()).collect();
        ExtensionOrchestrator::new(runner.clone(), install)
    }

    fn update(
        orchestrator: &mut ExtensionOrchestrator,
        root: &Path,
        source: &str,
    ) -> (UpdateOutcome, RecordingSink) {
        let mut sink = RecordingSink::default();
        let request = UpdateRequest {
            name: "demo",
            install_root: root,
            source,
            clean: false,
        };
        let outcome = orchestrator.update(&request, &mut sink);
        (outcome, sink)
    }

    #[test]
    fn missing_directory_is_not_found_without_running_git() {
        let root = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert_eq!(
            outcome,
            UpdateOutcome::NotFound {
                path: root.path().join("demo")
            }
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn installed_tag_equal_to_target_is_up_to_date() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git tag --points-at", CommandOutput::ok("1.2.0\n"))
                .respond("git ls-remote", ls_remote(&["1.0.0", "1.2.0", "2.0.0"])),
        );
        let mut orchestrator = orchestrator(&runner);

        for _ in 0..2 {
            let (outcome, _) = update(&mut orchestrator, root.path(), SOURCE);
            assert_eq!(outcome, UpdateOutcome::UpToDate { tag: "1.2.0".into() });
        }
        assert!(!runner.ran("git fetch"));
        assert!(!runner.ran("git checkout"));
        assert!(!runner.ran("npm"));
    }

    #[test]
    fn any_installed_tag_may_match() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git tag --points-at", CommandOutput::ok("v1.2.0\n1.2.0\n"))
                .respond("git ls-remote", ls_remote(&["1.2.0"])),
        );

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);
        assert_eq!(outcome, UpdateOutcome::UpToDate { tag: "1.2.0".into() });
    }

    #[test]
    fn newer_tag_runs_the_executor_in_the_extension_dir() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git tag --points-at", CommandOutput::ok("1.0.0\n"))
                .respond("git ls-remote", ls_remote(&["1.0.0", "1.2.0", "2.0.0-beta.1"])),
        );

        let (outcome, sink) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                from: Some("1.0.0".into()),
                to: "1.2.0".into()
            }
        );
        assert!(runner.ran("git checkout refs/tags/1.2.0"));
        assert!(runner.ran("npm install"));
        let ext_dir = root.path().join("demo");
        assert!(runner.calls().iter().all(|call| call.cwd == ext_dir));
        assert_eq!(
            sink.messages(Severity::Result),
            vec!["`demo` updated 1.0.0 -> 1.2.0."]
        );
    }

    #[test]
    fn untagged_head_forces_an_update() {
        let root = install_root_with("demo");
        let runner = Arc::new(ScriptedRunner::new().respond("git ls-remote", ls_remote(&["1.1.0"])));

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                from: None,
                to: "1.1.0".into()
            }
        );
    }

    #[test]
    fn unreadable_installed_tag_is_not_an_error() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git tag", CommandOutput::failed(128, "fatal: not a git repository"))
                .respond("git ls-remote", ls_remote(&["1.1.0"])),
        );

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);
        assert!(matches!(outcome, UpdateOutcome::Updated { from: None, .. }));
    }

    #[test]
    fn empty_remote_is_no_matching_version() {
        let root = install_root_with("demo");
        let runner = Arc::new(ScriptedRunner::new().respond("git ls-remote", CommandOutput::ok("")));

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert_eq!(
            outcome,
            UpdateOutcome::NoMatchingVersion {
                selector: "^1.0.0".into()
            }
        );
        assert!(!runner.ran("git fetch"));
    }

    #[test]
    fn selector_less_source_is_left_alone() {
        let root = install_root_with("demo");
        let runner = Arc::new(ScriptedRunner::new());

        let (outcome, sink) = update(
            &mut orchestrator(&runner),
            root.path(),
            "git+ssh://git@host.example:/srv/git/demo.git",
        );

        assert_eq!(outcome, UpdateOutcome::Unmanaged);
        assert!(!runner.ran("git ls-remote"));
        assert!(
            sink.messages(Severity::Status)
                .iter()
                .any(|m| m.contains("no #semver: selector"))
        );
    }

    #[test]
    fn list_failure_is_reported_with_error() {
        let root = install_root_with("demo");
        let runner = Arc::new(ScriptedRunner::new().respond(
            "git ls-remote",
            CommandOutput::failed(128, "fatal: Could not read from remote repository."),
        ));

        let (outcome, sink) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert!(matches!(outcome, UpdateOutcome::ListFailed { .. }));
        let last = sink.events.last().unwrap();
        assert_eq!(last.severity, Severity::Status);
        assert!(last.error.as_deref().unwrap().contains("Could not read"));
    }

    #[test]
    fn malformed_source_is_a_parse_failure() {
        let root = install_root_with("demo");
        let runner = Arc::new(ScriptedRunner::new());

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), "::nonsense::");

        assert!(matches!(outcome, UpdateOutcome::ParseFailed { .. }));
    }

    #[test]
    fn check_only_mode_never_executes() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git tag --points-at", CommandOutput::ok("1.0.0\n"))
                .respond("git ls-remote", ls_remote(&["1.3.0"])),
        );
        let mut orchestrator = orchestrator(&runner).with_mode(UpdateMode::CheckOnly);

        let (outcome, _) = update(&mut orchestrator, root.path(), SOURCE);

        assert_eq!(
            outcome,
            UpdateOutcome::UpdateAvailable {
                from: Some("1.0.0".into()),
                to: "1.3.0".into()
            }
        );
        assert!(!runner.ran("git fetch"));
    }

    #[test]
    fn checkout_failure_outcome_keeps_target_tag() {
        let root = install_root_with("demo");
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("git ls-remote", ls_remote(&["1.4.0"]))
                .respond("git checkout", CommandOutput::failed(1, "local changes")),
        );

        let (outcome, _) = update(&mut orchestrator(&runner), root.path(), SOURCE);

        assert!(matches!(outcome, UpdateOutcome::CheckoutFailed { ref tag, .. } if tag == "1.4.0"));
        assert!(!runner.ran("npm"));
    }
}
