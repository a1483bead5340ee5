use crate::agents::update::feedback::{FeedbackSink, Progress, Reporter};
use crate::agents::update::orchestrator::{ExtensionUpdater, UpdateRequest, report_outcome};
use crate::agents::update::outcome::{BatchReport, UpdateOutcome};
use crate::agents::update::task::{CancellationToken, TaskRegistry};
use crate::error::Result;
use indexmap::IndexMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Settings shared by every extension of one batch run.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub install_root: PathBuf,
    pub clean: bool,
    /// Pause between consecutive extensions, to go easy on the git host.
    pub pause: Duration,
}

/// Runs the configured extensions one after another.
pub struct BatchController<'a> {
    registry: &'a TaskRegistry,
    settings: BatchSettings,
}

impl<'a> BatchController<'a> {
    pub fn new(registry: &'a TaskRegistry, settings: BatchSettings) -> Self {
        Self { registry, settings }
    }

    /// Processes `extensions` in insertion order.
    ///
    /// Fails only when another run is already in progress. Per-extension problems end up
    /// in the report; cancellation is honoured before each extension starts.
    pub fn run(
        &self,
        extensions: &IndexMap<String, String>,
        updater: &mut dyn ExtensionUpdater,
        sink: &mut dyn FeedbackSink,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let mut state = self.registry.start(extensions.len(), cancel.clone())?;
        let mut report = BatchReport {
            total: extensions.len(),
            ..BatchReport::default()
        };

        info!(total = extensions.len(), "extension update run started");
        sink.run_started(extensions.len());

        for (index, (name, source)) in extensions.iter().enumerate() {
            if state.cancellation_requested() {
                info!(processed = index, "run cancelled");
                report.cancelled = true;
                break;
            }

            if index > 0 && !self.settings.pause.is_zero() {
                thread::sleep(self.settings.pause);
            }

            let current = state.advance();
            sink.progress(&Progress {
                current,
                total: state.total,
                extension: name,
            });

            let request = UpdateRequest {
                name,
                install_root: &self.settings.install_root,
                source,
                clean: self.settings.clean,
            };
            let outcome = Self::update_one(updater, &request, sink);
            sink.extension_finished(name, &outcome);

            state.any_updated |= outcome.changed_checkout();
            report.outcomes.push((name.clone(), outcome));
        }

        report.any_updated = state.any_updated;
        sink.run_finished(&report);
        drop(state);

        info!(
            processed = report.processed(),
            any_updated = report.any_updated,
            "extension update run finished"
        );
        Ok(report)
    }

    /// A panic while updating one extension becomes an `Unknown` outcome for it alone.
    fn update_one(
        updater: &mut dyn ExtensionUpdater,
        request: &UpdateRequest<'_>,
        sink: &mut dyn FeedbackSink,
    ) -> UpdateOutcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| updater.update(request, &mut *sink)));

        match attempt {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "update panicked".to_string());
                warn!(extension = request.name, %reason, "extension update panicked");

                let outcome = UpdateOutcome::Unknown { reason };
                report_outcome(&mut Reporter::new(request.name, sink), request.name, &outcome);
                outcome
            }
        }
    }
}
