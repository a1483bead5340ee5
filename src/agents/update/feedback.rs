// Feedback channel shared by the orchestrator, the executor and the batch controller.
//
// Producers only see `FeedbackSink`; each sink applies its own severity threshold, so
// verbosity never changes control flow.
use crate::agents::update::outcome::{BatchReport, UpdateOutcome};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

/// 1 is a user-facing result, 4 the most verbose diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Result = 1,
    Status = 2,
    Detail = 3,
    Trace = 4,
}

impl Severity {
    /// Display threshold for `-v` repeated `count` times.
    pub fn threshold_for_verbosity(count: u8) -> Self {
        match count {
            0 => Severity::Result,
            1 => Severity::Status,
            2 => Severity::Detail,
            _ => Severity::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Feedback<'a> {
    pub extension: &'a str,
    pub message: &'a str,
    pub severity: Severity,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub current: usize,
    pub total: usize,
    pub extension: &'a str,
}

pub trait FeedbackSink {
    fn emit(&mut self, feedback: &Feedback<'_>);

    fn run_started(&mut self, _total: usize) {}

    /// Called before extension `current` (1-based) starts.
    fn progress(&mut self, _progress: &Progress<'_>) {}

    /// Called once per extension with its final outcome.
    fn extension_finished(&mut self, _extension: &str, _outcome: &UpdateOutcome) {}

    fn run_finished(&mut self, _report: &BatchReport) {}
}

/// Convenience wrapper binding a sink to one extension name.
pub struct Reporter<'a> {
    extension: &'a str,
    sink: &'a mut dyn FeedbackSink,
}

impl<'a> Reporter<'a> {
    pub fn new(extension: &'a str, sink: &'a mut dyn FeedbackSink) -> Self {
        Self { extension, sink }
    }

    pub fn emit(&mut self, severity: Severity, message: &str) {
        self.sink.emit(&Feedback {
            extension: self.extension,
            message,
            severity,
            error: None,
        });
    }

    pub fn emit_error(&mut self, severity: Severity, message: &str, error: &str) {
        self.sink.emit(&Feedback {
            extension: self.extension,
            message,
            severity,
            error: Some(error),
        });
    }

    pub fn status(&mut self, message: &str) {
        self.emit(Severity::Status, message);
    }

    pub fn detail(&mut self, message: &str) {
        self.emit(Severity::Detail, message);
    }

    pub fn trace(&mut self, message: &str) {
        self.emit(Severity::Trace, message);
    }

    /// Forwards captured command output line by line at trace level.
    pub fn trace_output(&mut self, command: &str, output: &str) {
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            self.emit(Severity::Trace, &format!("{command}: {line}"));
        }
    }
}

/// Terminal notifier: colored lines plus an indicatif bar while a batch runs.
pub struct ConsoleSink {
    threshold: Severity,
    show_progress: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleSink {
    pub fn new(threshold: Severity, show_progress: bool) -> Self {
        Self {
            threshold,
            show_progress,
            bar: None,
        }
    }

    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl FeedbackSink for ConsoleSink {
    fn emit(&mut self, feedback: &Feedback<'_>) {
        if feedback.severity > self.threshold {
            return;
        }

        let prefix = format!("[{}]", feedback.extension).bright_cyan();
        let line = match (feedback.error, feedback.severity) {
            (Some(error), _) => format!(
                "  {} {} {}",
                prefix,
                feedback.message.red(),
                error.dimmed()
            ),
            (None, Severity::Result) => format!("  {} {}", prefix, feedback.message.green().bold()),
            (None, Severity::Status) => format!("  {} {}", prefix, feedback.message),
            (None, _) => format!("  {} {}", prefix, feedback.message.dimmed()),
        };
        self.print(line);
    }

    fn run_started(&mut self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        if !self.show_progress {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=>-"));
        }
        self.bar = Some(bar);
    }

    fn progress(&mut self, progress: &Progress<'_>) {
        if let Some(bar) = &self.bar {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.current.saturating_sub(1) as u64);
            bar.set_message(format!("Checking {}", progress.extension));
        }
    }

    fn run_finished(&mut self, report: &BatchReport) {
        if let Some(bar) = self.bar.take() {
            bar.set_position(report.processed() as u64);
            bar.finish_and_clear();
        }
    }
}

/// Line-oriented sink for worker processes: `[name]:message` on stdout, errors on stderr.
pub struct StreamSink<O: Write, E: Write> {
    threshold: Severity,
    out: O,
    err: E,
}

impl StreamSink<io::Stdout, io::Stderr> {
    pub fn stdio(threshold: Severity) -> Self {
        Self::new(threshold, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> StreamSink<O, E> {
    pub fn new(threshold: Severity, out: O, err: E) -> Self {
        Self {
            threshold,
            out,
            err,
        }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> FeedbackSink for StreamSink<O, E> {
    fn emit(&mut self, feedback: &Feedback<'_>) {
        if feedback.severity > self.threshold {
            return;
        }

        // Broken pipes to the parent are not worth aborting an update for.
        let _ = match feedback.error {
            Some(error) => writeln!(
                self.err,
                "[{}]:{} {}",
                feedback.extension, feedback.message, error
            ),
            None => writeln!(self.out, "[{}]:{}", feedback.extension, feedback.message),
        };
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn FeedbackSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn FeedbackSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl FeedbackSink for FanOutSink {
    fn emit(&mut self, feedback: &Feedback<'_>) {
        for sink in &mut self.sinks {
            sink.emit(feedback);
        }
    }

    fn run_started(&mut self, total: usize) {
        for sink in &mut self.sinks {
            sink.run_started(total);
        }
    }

    fn progress(&mut self, progress: &Progress<'_>) {
        for sink in &mut self.sinks {
            sink.progress(progress);
        }
    }

    fn extension_finished(&mut self, extension: &str, outcome: &UpdateOutcome) {
        for sink in &mut self.sinks {
            sink.extension_finished(extension, outcome);
        }
    }

    fn run_finished(&mut self, report: &BatchReport) {
        for sink in &mut self.sinks {
            sink.run_finished(report);
        }
    }
}
