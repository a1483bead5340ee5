use crate::agents::config_editor::validate_entry;
use crate::agents::update::{
    BatchController, BatchReport, BatchSettings, CancellationToken, ConsoleSink,
    ExtensionOrchestrator, ExtensionUpdater, FanOutSink, OutcomeCategory, RunLog, Severity,
    StreamSink, TaskRegistry, UpdateInteraction, UpdateMode, UpdateOutcome, UpdateRequest,
    WorkerProcessUpdater, format_outcome_line,
};
use crate::agents::{AddResult, ConfigEditor, ExtensionScannerAgent, VersionControlAgent};
use crate::config::ManagerConfig;
use crate::error::{ExtMgrError, Result};
use crate::git::ParsedSource;
use crate::utils::{CommandRunner, PathValidator, SystemCommandRunner};
use crate::versioning::VersionResolver;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Flags of the `update` command; each one can also be switched on from the configuration.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub clean: bool,
    pub keep_log: bool,
    pub out_of_process: bool,
    pub interactive: bool,
    pub extensions_dir: Option<PathBuf>,
}

/// Execute the update workflow
pub fn execute_update(config_path: &Path, verbosity: u8, options: UpdateOptions) -> Result<()> {
    println!("{}", "Starting extension update process...".cyan().bold());

    // Step 1: Read configuration
    println!("\n{}", "1. Reading configuration...".yellow());
    let config = ManagerConfig::load(config_path)?;
    println!(
        "   Found {} configured extension(s) in {}",
        config.extensions.len(),
        config_path.display()
    );

    // Step 2: Validate install root
    println!("\n{}", "2. Validating extensions directory...".yellow());
    let install_root = validated_install_root(&config, options.extensions_dir.as_deref())?;
    println!(
        "{}",
        format!("✓ Using {}", install_root.display()).green()
    );

    let mut sinks = FanOutSink::new().with(Box::new(ConsoleSink::new(
        Severity::threshold_for_verbosity(verbosity),
        !options.interactive,
    )));
    if options.keep_log || config.keep_log {
        let log = RunLog::create(&config.log_dir())?;
        println!("   Run log: {}", log.path().display().to_string().dimmed());
        sinks = sinks.with(Box::new(log));
    }

    // Step 3: Update extensions
    println!("\n{}", "3. Updating extensions...".yellow());
    let cancel = CancellationToken::new();
    let mut updater: Box<dyn ExtensionUpdater> =
        if (options.out_of_process || config.out_of_process) && !options.interactive {
            Box::new(WorkerProcessUpdater::current_exe(
                config.install_command.clone(),
            )?)
        } else {
            if options.out_of_process {
                println!(
                    "   {}",
                    "Interactive mode runs in-process; ignoring --out-of-process".dimmed()
                );
            }
            Box::new(
                ExtensionOrchestrator::new(
                    Arc::new(SystemCommandRunner),
                    config.install_command.clone(),
                )
                .with_interaction(UpdateInteraction::new(options.interactive, cancel.clone())),
            )
        };

    let settings = BatchSettings {
        install_root,
        clean: options.clean || config.clean,
        pause: config.pause(),
    };
    let registry = TaskRegistry::with_lock_file(config.lock_file());
    let report = BatchController::new(&registry, settings).run(
        &config.extensions,
        updater.as_mut(),
        &mut sinks,
        &cancel,
    )?;

    println!("{}", "✓ Update completed".green());

    // Step 4: Display summary
    print_update_report(&report);

    if report.cancelled {
        println!("\n{}", "Update cancelled by user.".yellow());
    }

    if report.any_updated {
        println!(
            "\n{}",
            "Extensions were updated. Reload the editor window to activate them."
                .green()
                .bold()
        );
    } else {
        println!("\n{}", "No updates were applied".yellow());
    }

    let closing = closing_message(&report);
    let closing = if report.cancelled || report.count(OutcomeCategory::Failed) > 0 {
        closing.yellow().bold()
    } else {
        closing.green().bold()
    };
    println!("\n{closing}");
    Ok(())
}

/// Last line of `update`; only a run that finished without failures counts as a success.
fn closing_message(report: &BatchReport) -> &'static str {
    let failed = report.count(OutcomeCategory::Failed);
    if report.cancelled {
        "Update process stopped before every extension was processed."
    } else if failed > 0 && failed == report.processed() {
        "Update process failed for every extension."
    } else if failed > 0 {
        "Update process completed with failures."
    } else {
        "✨ Update process completed successfully!"
    }
}

/// Execute the check workflow (dry-run)
pub fn execute_check(
    config_path: &Path,
    verbosity: u8,
    extensions_dir: Option<&Path>,
) -> Result<()> {
    println!("{}", "Checking for available updates...".cyan().bold());

    // Step 1: Read configuration
    println!("\n{}", "1. Reading configuration...".yellow());
    let config = ManagerConfig::load(config_path)?;
    println!(
        "   Found {} configured extension(s)",
        config.extensions.len()
    );

    // Step 2: Validate install root
    println!("\n{}", "2. Validating extensions directory...".yellow());
    let install_root = validated_install_root(&config, extensions_dir)?;
    println!(
        "{}",
        format!("✓ Using {}", install_root.display()).green()
    );

    // Step 3: Resolve every extension without touching its checkout
    println!("\n{}", "3. Checking for available updates...".yellow());
    let mut updater = ExtensionOrchestrator::new(
        Arc::new(SystemCommandRunner),
        config.install_command.clone(),
    )
    .with_mode(UpdateMode::CheckOnly);
    let mut sink = ConsoleSink::new(Severity::threshold_for_verbosity(verbosity), true);

    let settings = BatchSettings {
        install_root,
        clean: false,
        pause: config.pause(),
    };
    let registry = TaskRegistry::with_lock_file(config.lock_file());
    let report = BatchController::new(&registry, settings).run(
        &config.extensions,
        &mut updater,
        &mut sink,
        &CancellationToken::new(),
    )?;

    println!("{}", "✓ Check completed".green());

    // Step 4: Display available updates
    print_available_updates(&report);

    Ok(())
}

fn print_available_updates(report: &BatchReport) {
    print_failure_hint(report);

    let available: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|(name, outcome)| match outcome {
            UpdateOutcome::UpdateAvailable { from, to } => Some((name, from, to)),
            _ => None,
        })
        .collect();

    if available.is_empty() {
        println!("\n{}", "✨ All extensions are up to date!".green().bold());
        return;
    }

    println!("\n{}", "📦 Available Updates:".cyan().bold());
    println!(
        "{}",
        format!("Found {} update(s)", available.len()).yellow()
    );
    for (name, from, to) in available {
        println!(
            "  • {} {} → {}",
            name.white().bold(),
            from.as_deref().unwrap_or("(untagged)").red(),
            to.green().bold()
        );
    }

    println!("\n{}", "To apply these updates, run:".dimmed());
    println!("  {}", "pvtextmgr update".cyan());
}

fn print_update_report(report: &BatchReport) {
    println!("\n{}", "📊 Update Summary:".cyan().bold());
    println!(
        "   {} processed of {} configured",
        report.processed(),
        report.total
    );
    println!(
        "   {} updated, {} up to date, {} skipped, {} failed",
        report.count(OutcomeCategory::Updated).to_string().green(),
        report.count(OutcomeCategory::Current),
        report.count(OutcomeCategory::Skipped),
        report.count(OutcomeCategory::Failed).to_string().red()
    );

    let updated: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|(name, outcome)| match outcome {
            UpdateOutcome::Updated { from, to } => Some((name, from, to)),
            _ => None,
        })
        .collect();

    if !updated.is_empty() {
        println!("\n{}:", "Updated extensions".cyan().bold());
        for (name, from, to) in updated {
            println!(
                "  • {} {} → {}",
                name.white().bold(),
                from.as_deref().unwrap_or("(untagged)").red(),
                to.green().bold()
            );
        }
    }

    print_failure_hint(report);
}

fn print_failure_hint(report: &BatchReport) {
    let failed = report.count(OutcomeCategory::Failed);
    if failed > 0 {
        println!(
            "{}",
            format!("   {failed} extension(s) failed; rerun with -v for details").dimmed()
        );
    }
}

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
    pub name: String,
    pub selector: String,
    pub installed: InstalledState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstalledState {
    Missing,
    Untagged,
    Tagged(Vec<String>),
}

/// Execute the list workflow - display all configured extensions
pub fn execute_list(config_path: &Path, extensions_dir: Option<&Path>) -> Result<()> {
    println!("{}", "Listing configured extensions...".cyan().bold());

    // Step 1: Read configuration
    println!("\n{}", "1. Reading configuration...".yellow());
    let config = ManagerConfig::load(config_path)?;
    let install_root = config.resolve_extensions_dir(extensions_dir)?;
    println!("{}", "✓ Configuration loaded".green());

    // Step 2: Inspect installed checkouts
    println!("\n{}", "2. Inspecting installed extensions...".yellow());
    let rows = collect_list_rows(&config, &install_root, Arc::new(SystemCommandRunner));

    if rows.is_empty() {
        println!("\n{}", "No extensions configured.".yellow());
        return Ok(());
    }

    println!(
        "\n{}",
        format!("📦 Extensions ({}):", install_root.display())
            .cyan()
            .bold()
    );
    for row in &rows {
        let installed = match &row.installed {
            InstalledState::Missing => "not installed".red(),
            InstalledState::Untagged => "untagged".yellow(),
            InstalledState::Tagged(tags) => tags.join(", ").green(),
        };
        println!(
            "  • {} {} {}",
            row.name.white().bold(),
            format!("[{}]", row.selector).dimmed(),
            installed
        );
    }
    println!("\n{}", format!("Total: {} extension(s)", rows.len()).dimmed());

    Ok(())
}

pub fn collect_list_rows(
    config: &ManagerConfig,
    install_root: &Path,
    runner: Arc<dyn CommandRunner>,
) -> Vec<ListRow> {
    let scanner = ExtensionScannerAgent::new(install_root);

    config
        .extensions
        .iter()
        .map(|(name, source)| {
            let selector = match ParsedSource::parse(source) {
                Ok(parsed) => parsed
                    .selector
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "no selector".to_string()),
                Err(_) => "invalid source".to_string(),
            };

            let installed = match scanner.locate(name) {
                Ok(Some(info)) => {
                    let tags = VersionControlAgent::new(runner.clone(), &info.path)
                        .installed_tags()
                        .unwrap_or_default();
                    if tags.is_empty() {
                        InstalledState::Untagged
                    } else {
                        InstalledState::Tagged(tags)
                    }
                }
                _ => InstalledState::Missing,
            };

            ListRow {
                name: name.clone(),
                selector,
                installed,
            }
        })
        .collect()
}

/// Add a new extension entry to the configuration file
pub fn execute_add(config_path: &Path, name: &str, source: &str, no_verify: bool) -> Result<()> {
    println!(
        "{}",
        "Adding extension to configuration...".cyan().bold()
    );

    // Step 1: Validate entry
    println!("\n{}", "1. Validating entry...".yellow());
    let parsed = validate_entry(name, source)?;
    println!(
        "{}",
        format!("✓ {} from {}", name, parsed.display_address()).green()
    );

    // Step 2: Check that the selector resolves against the remote
    if no_verify {
        println!(
            "\n{}",
            "2. Skipping remote verification (--no-verify)".yellow()
        );
    } else {
        println!("\n{}", "2. Validating selector against remote tags...".yellow());
        let work_dir = std::env::current_dir()?;
        let tag = verify_source(&parsed, &work_dir, Arc::new(SystemCommandRunner))?;
        println!("   {}", format!("✓ {} resolves to {}", source_selector(&parsed), tag).green());
    }

    // Step 3: Write configuration
    println!("\n{}", "3. Writing to configuration...".yellow());
    let editor = ConfigEditor::new(config_path);
    let result = editor.upsert_extension(name, source)?;
    print_add_result(&result);

    println!("\n{}", "✨ Entry added successfully!".green().bold());

    Ok(())
}

fn source_selector(parsed: &ParsedSource) -> String {
    parsed
        .selector
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Lists remote tags and returns the tag the selector currently resolves to.
pub fn verify_source(
    parsed: &ParsedSource,
    work_dir: &Path,
    runner: Arc<dyn CommandRunner>,
) -> Result<String> {
    let Some(selector) = parsed.selector.as_ref() else {
        return Err(ExtMgrError::ProjectValidation(
            "Source has no #semver: selector".into(),
        ));
    };

    let tags = VersionControlAgent::new(runner, work_dir).list_remote_tags(parsed)?;
    VersionResolver::resolve(selector, &tags).ok_or_else(|| {
        ExtMgrError::ProjectValidation(format!(
            "Selector '{}' matches none of the {} tag(s) at {}",
            selector,
            tags.len(),
            parsed.display_address()
        ))
    })
}

fn print_add_result(result: &AddResult) {
    match &result.replaced {
        Some(previous) => println!(
            "{}",
            format!("✓ Extension '{}' replaced (was {})", result.name, previous).green()
        ),
        None => println!(
            "{}",
            format!("✓ Extension '{}' added", result.name).green()
        ),
    }
}

/// Worker entry point: update one extension in-process and report the outcome on stdout.
pub fn execute_worker(
    name: &str,
    install_root: &Path,
    source: &str,
    clean: bool,
    install_command: Vec<String>,
    verbosity: u8,
) -> Result<UpdateOutcome> {
    let install_root = PathValidator::validate_install_root(install_root)?;
    let mut sink = StreamSink::stdio(Severity::threshold_for_verbosity(verbosity));
    let mut orchestrator = ExtensionOrchestrator::new(Arc::new(SystemCommandRunner), install_command);

    let outcome = orchestrator.update(
        &UpdateRequest {
            name,
            install_root: &install_root,
            source,
            clean,
        },
        &mut sink,
    );

    println!("{}", format_outcome_line(&outcome)?);
    Ok(outcome)
}

fn validated_install_root(config: &ManagerConfig, override_dir: Option<&Path>) -> Result<PathBuf> {
    let root = config.resolve_extensions_dir(override_dir)?;
    PathValidator::validate_install_root(&root)
}
