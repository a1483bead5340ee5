//! Version selectors as written after `#semver:` in an extension source.
//!
//! Ranges use the npm dialect, which is translated onto `semver::VersionReq`:
//! - `1.2.3` - exact match, `1.2` / `1` - any patch / minor within it
//! - `^1.2.3`, `~1.2.3`, `>=1.2.3 <2.0.0` - comparators (space or comma separated)
//! - `1.2.x`, `1.x`, `*` - wildcards
//! - `1.2.3 - 2.0.0` - inclusive hyphen range
//! - `^1.0.0 || ^2.0.0` - alternatives

use crate::error::{ExtMgrError, Result};
use semver::{Version, VersionReq};
use std::fmt;

const LATEST: &str = "latest";
const PRERELEASE: &str = "prerelease";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Highest stable release.
    Latest,
    /// Highest release, prereleases included.
    Prerelease,
    Range(VersionRange),
}

impl Selector {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            LATEST => Ok(Selector::Latest),
            PRERELEASE => Ok(Selector::Prerelease),
            _ => VersionRange::parse(raw).map(Selector::Range),
        }
    }

    /// The selector exactly as the user wrote it.
    pub fn as_str(&self) -> &str {
        match self {
            Selector::Latest => LATEST,
            Selector::Prerelease => PRERELEASE,
            Selector::Range(range) => range.raw(),
        }
    }

    pub fn accepts(&self, version: &Version) -> bool {
        match self {
            Selector::Latest => version.pre.is_empty(),
            Selector::Prerelease => true,
            Selector::Range(range) => range.matches(version),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn parse(raw: &str) -> Result<Self> {
        let alternatives = raw
            .split("||")
            .map(|alternative| {
                let translated = translate_alternative(alternative);
                VersionReq::parse(&translated).map_err(|e| {
                    ExtMgrError::SourceParse(format!(
                        "Invalid semver range '{}': {}",
                        raw.trim(),
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Rewrites one npm alternative into the comma separated form `VersionReq` expects.
fn translate_alternative(alternative: &str) -> String {
    let alternative = alternative.trim();
    if alternative.is_empty() || alternative == "*" || alternative.eq_ignore_ascii_case("x") {
        return "*".to_string();
    }

    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(
            ">={}, <={}",
            strip_v_prefix(low.trim()),
            strip_v_prefix(high.trim())
        );
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();

    for token in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_op.push_str(token);
            continue;
        }

        let token = format!("{}{}", std::mem::take(&mut pending_op), token);
        comparators.push(normalize_comparator(&token));
    }

    if !pending_op.is_empty() {
        // A dangling operator is left for VersionReq to reject.
        comparators.push(pending_op);
    }

    comparators.join(", ")
}

fn normalize_comparator(token: &str) -> String {
    let op_len = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    let version = strip_v_prefix(version);

    let is_wildcard = version
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"));

    // npm reads a bare version as exact, VersionReq would read it as a caret requirement.
    if op.is_empty() && !is_wildcard {
        format!("={version}")
    } else {
        format!("{op}{version}")
    }
}

fn strip_v_prefix(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}
