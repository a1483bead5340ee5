use crate::agents::update::task::CancellationToken;
use crate::error::{ExtMgrError, Result};
use colored::Colorize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Apply,
    Skip,
    ApplyAll,
    Quit,
    Unrecognised,
}

fn decide(input: &str) -> Decision {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Decision::Apply,
        "n" | "no" => Decision::Skip,
        "a" | "all" => Decision::ApplyAll,
        "q" | "quit" => Decision::Quit,
        _ => Decision::Unrecognised,
    }
}

/// Asks the user before each update when interactive mode is on.
///
/// Quitting declines the current update and requests cancellation of the batch,
/// which the controller honours before the next extension.
pub struct UpdateInteraction {
    enabled: bool,
    apply_all: bool,
    cancel: CancellationToken,
}

impl UpdateInteraction {
    pub fn new(enabled: bool, cancel: CancellationToken) -> Self {
        Self {
            enabled,
            apply_all: false,
            cancel,
        }
    }

    /// Non-interactive approval: every update is applied.
    pub fn disabled() -> Self {
        Self::new(false, CancellationToken::new())
    }

    pub fn approve(&mut self, name: &str, installed: Option<&str>, target: &str) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }

        println!(
            "\n{} {} {} {} to {}",
            "[Extension]".cyan().bold(),
            name.white().bold(),
            "from".dimmed(),
            installed.unwrap_or("(untagged)").red(),
            target.green().bold()
        );

        if self.apply_all {
            println!("{}", "Auto-applying (previously selected 'all').".dimmed());
            return Ok(true);
        }

        loop {
            print!("{}", "Apply this update? [Y/n/a/q]: ".bold());
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                // Nobody left to answer; stop the batch like `q` would.
                self.cancel.cancel();
                return Err(ExtMgrError::UserCancelled);
            }

            if let Some(approved) = self.apply(decide(&input)) {
                return Ok(approved);
            }
            println!(
                "{}",
                "Please answer with y(es), n(o), a(ll), or q(quit).".red()
            );
        }
    }

    fn apply(&mut self, decision: Decision) -> Option<bool> {
        match decision {
            Decision::Apply => Some(true),
            Decision::Skip => {
                println!("{}", "Skipping this update.".dimmed());
                Some(false)
            }
            Decision::ApplyAll => {
                println!(
                    "{}",
                    "Applying this and all remaining updates.".green().bold()
                );
                self.apply_all = true;
                Some(true)
            }
            Decision::Quit => {
                println!("{}", "Stopping update process at user request.".yellow());
                self.cancel.cancel();
                Some(false)
            }
            Decision::Unrecognised => None,
        }
    }
}
