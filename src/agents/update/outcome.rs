use crate::agents::update::feedback::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of one extension's update attempt within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UpdateOutcome {
    UpToDate { tag: String },
    Updated { from: Option<String>, to: String },
    /// Check-only runs stop here instead of executing the update.
    UpdateAvailable { from: Option<String>, to: String },
    /// Source carries no `#semver:` selector.
    Unmanaged,
    /// The user refused the update in interactive mode.
    Declined { to: String },
    NoMatchingVersion { selector: String },
    NotFound { path: PathBuf },
    ParseFailed { reason: String },
    ListFailed { reason: String },
    FetchFailed { reason: String },
    CheckoutFailed { tag: String, reason: String },
    CleanFailed { tag: String, reason: String },
    InstallFailed { tag: String, reason: String },
    Unknown { reason: String },
}

/// Coarse grouping used for run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeCategory {
    Updated,
    Current,
    Available,
    Skipped,
    Failed,
}

impl UpdateOutcome {
    /// Numeric status, also used as the worker process exit code.
    pub fn status_code(&self) -> i32 {
        match self {
            UpdateOutcome::UpToDate { .. }
            | UpdateOutcome::Updated { .. }
            | UpdateOutcome::UpdateAvailable { .. }
            | UpdateOutcome::Unmanaged
            | UpdateOutcome::Declined { .. } => 0,
            UpdateOutcome::NotFound { .. } => 3,
            UpdateOutcome::ParseFailed { .. } => 4,
            UpdateOutcome::ListFailed { .. } => 5,
            UpdateOutcome::NoMatchingVersion { .. } => 6,
            UpdateOutcome::FetchFailed { .. } => 10,
            UpdateOutcome::CheckoutFailed { .. } => 11,
            UpdateOutcome::CleanFailed { .. } => 12,
            UpdateOutcome::InstallFailed { .. } => 13,
            UpdateOutcome::Unknown { .. } => 70,
        }
    }

    /// Best-effort reconstruction from a bare status code when no detailed report is available.
    pub fn from_status_code(code: i32, reason: String) -> Self {
        match code {
            3 => UpdateOutcome::NotFound {
                path: PathBuf::new(),
            },
            4 => UpdateOutcome::ParseFailed { reason },
            5 => UpdateOutcome::ListFailed { reason },
            6 => UpdateOutcome::NoMatchingVersion {
                selector: String::new(),
            },
            10 => UpdateOutcome::FetchFailed { reason },
            11 => UpdateOutcome::CheckoutFailed {
                tag: String::new(),
                reason,
            },
            12 => UpdateOutcome::CleanFailed {
                tag: String::new(),
                reason,
            },
            13 => UpdateOutcome::InstallFailed {
                tag: String::new(),
                reason,
            },
            _ => UpdateOutcome::Unknown { reason },
        }
    }

    pub fn category(&self) -> OutcomeCategory {
        match self {
            UpdateOutcome::Updated { .. } => OutcomeCategory::Updated,
            UpdateOutcome::UpToDate { .. } => OutcomeCategory::Current,
            UpdateOutcome::UpdateAvailable { .. } => OutcomeCategory::Available,
            UpdateOutcome::Unmanaged | UpdateOutcome::Declined { .. } => OutcomeCategory::Skipped,
            _ => OutcomeCategory::Failed,
        }
    }

    /// True when a new tag was checked out, even if a later step failed.
    pub fn changed_checkout(&self) -> bool {
        matches!(
            self,
            UpdateOutcome::Updated { .. }
                | UpdateOutcome::CleanFailed { .. }
                | UpdateOutcome::InstallFailed { .. }
        )
    }

    pub fn severity(&self) -> Severity {
        match self {
            UpdateOutcome::Updated { .. } | UpdateOutcome::UpdateAvailable { .. } => {
                Severity::Result
            }
            _ => Severity::Status,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            UpdateOutcome::ParseFailed { reason }
            | UpdateOutcome::ListFailed { reason }
            | UpdateOutcome::FetchFailed { reason }
            | UpdateOutcome::CheckoutFailed { reason, .. }
            | UpdateOutcome::CleanFailed { reason, .. }
            | UpdateOutcome::InstallFailed { reason, .. }
            | UpdateOutcome::Unknown { reason } => Some(reason),
            _ => None,
        }
    }

    /// Human readable one-line summary for `name`.
    pub fn describe(&self, name: &str) -> String {
        match self {
            UpdateOutcome::UpToDate { tag } => format!("`{name}` up to date ({tag})."),
            UpdateOutcome::Updated { from, to } => {
                format!("`{name}` updated {} -> {to}.", installed_label(from))
            }
            UpdateOutcome::UpdateAvailable { from, to } => {
                format!("`{name}` can be updated {} -> {to}.", installed_label(from))
            }
            UpdateOutcome::Unmanaged => {
                format!("`{name}` has no #semver: selector and is not managed.")
            }
            UpdateOutcome::Declined { to } => format!("`{name}` update to {to} skipped."),
            UpdateOutcome::NoMatchingVersion { selector } => format!(
                "`{name}` does not have any matching version in the indicated repository ({selector})."
            ),
            UpdateOutcome::NotFound { path } => {
                format!("`{name}` not found at {}.", path.display())
            }
            UpdateOutcome::ParseFailed { .. } => format!("`{name}` has an invalid source."),
            UpdateOutcome::ListFailed { .. } => {
                format!("`{name}` could not list remote tags.")
            }
            UpdateOutcome::FetchFailed { .. } => format!("`{name}` fetch failed."),
            UpdateOutcome::CheckoutFailed { tag, .. } => {
                format!("`{name}` could not check out {tag}.")
            }
            UpdateOutcome::CleanFailed { tag, .. } => {
                format!("`{name}` checked out {tag} but clean failed.")
            }
            UpdateOutcome::InstallFailed { tag, .. } => {
                format!("`{name}` checked out {tag} but dependency install failed.")
            }
            UpdateOutcome::Unknown { .. } => format!("`{name}` update failed unexpectedly."),
        }
    }
}

fn installed_label(from: &Option<String>) -> &str {
    from.as_deref().unwrap_or("(untagged)")
}

/// Aggregate of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub outcomes: Vec<(String, UpdateOutcome)>,
    pub any_updated: bool,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn count(&self, category: OutcomeCategory) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.category() == category)
            .count()
    }

    #[cfg(test)]
    pub fn outcome_for(&self, name: &str) -> Option<&UpdateOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_codes_are_distinct() {
        let outcomes = [
            UpdateOutcome::NotFound {
                path: PathBuf::from("/x"),
            },
            UpdateOutcome::ParseFailed { reason: "r".into() },
            UpdateOutcome::ListFailed { reason: "r".into() },
            UpdateOutcome::NoMatchingVersion {
                selector: "^1".into(),
            },
            UpdateOutcome::FetchFailed { reason: "r".into() },
            UpdateOutcome::CheckoutFailed {
                tag: "1.0.0".into(),
                reason: "r".into(),
            },
            UpdateOutcome::CleanFailed {
                tag: "1.0.0".into(),
                reason: "r".into(),
            },
            UpdateOutcome::InstallFailed {
                tag: "1.0.0".into(),
                reason: "r".into(),
            },
            UpdateOutcome::Unknown { reason: "r".into() },
        ];

        let mut codes: Vec<i32> = outcomes.iter().map(UpdateOutcome::status_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), outcomes.len());

        for outcome in &outcomes {
            let rebuilt = UpdateOutcome::from_status_code(outcome.status_code(), "r".into());
            assert_eq!(rebuilt.status_code(), outcome.status_code());
        }
    }

    #[test]
    fn partial_updates_still_count_as_changed() {
        let install_failed = UpdateOutcome::InstallFailed {
            tag: "1.2.0".into(),
            reason: "npm".into(),
        };
        assert!(install_failed.changed_checkout());
        assert_eq!(install_failed.category(), OutcomeCategory::Failed);

        let fetch_failed = UpdateOutcome::FetchFailed { reason: "net".into() };
        assert!(!fetch_failed.changed_checkout());
    }

    #[test]
    fn serialises_with_status_tag() {
        let outcome = UpdateOutcome::Updated {
            from: Some("1.0.0".into()),
            to: "1.2.0".into(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"updated","from":"1.0.0","to":"1.2.0"}"#);
        let back: UpdateOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn report_counts_by_category() {
        let report = BatchReport {
            total: 3,
            outcomes: vec![
                (
                    "a".into(),
                    UpdateOutcome::Updated {
                        from: None,
                        to: "1.0.0".into(),
                    },
                ),
                ("b".into(), UpdateOutcome::UpToDate { tag: "2.0.0".into() }),
                ("c".into(), UpdateOutcome::Unmanaged),
            ],
            any_updated: true,
            cancelled: false,
        };
        assert_eq!(report.count(OutcomeCategory::Updated), 1);
        assert_eq!(report.count(OutcomeCategory::Current), 1);
        assert_eq!(report.count(OutcomeCategory::Skipped), 1);
        assert_eq!(report.count(OutcomeCategory::Failed), 0);
        assert_eq!(report.outcome_for("b").unwrap().status_code(), 0);
    }
}
