// Update pipeline for private extensions.
//
// - BatchController: serial loop over the configured extensions
// - ExtensionOrchestrator: scan, parse, list, resolve and decide for one extension
// - UpdateExecutor: fetch, checkout, clean and install once a target tag is chosen
// - WorkerProcessUpdater: runs the orchestrator in a child process per extension
// - Feedback sinks: console, worker stream, run log and fan-out
pub mod controller;
pub mod executor;
pub mod feedback;
pub mod interaction;
pub mod orchestrator;
pub mod outcome;
pub mod run_log;
pub mod task;
pub mod worker;

pub use controller::{BatchController, BatchSettings};
pub use feedback::{ConsoleSink, FanOutSink, Severity, StreamSink};
pub use interaction::UpdateInteraction;
pub use orchestrator::{ExtensionOrchestrator, ExtensionUpdater, UpdateMode, UpdateRequest};
pub use outcome::{BatchReport, OutcomeCategory, UpdateOutcome};
pub use run_log::RunLog;
pub use task::{CancellationToken, TaskRegistry};
pub use worker::{WorkerProcessUpdater, format_outcome_line};
