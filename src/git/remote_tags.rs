use regex::Regex;
use std::sync::LazyLock;

static PEELED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"refs/tags/(.+)\^\{\}$").expect("peeled tag pattern is valid")
});

/// Extracts tag names from `git ls-remote --tags` output.
///
/// Only peeled annotated-tag lines (`refs/tags/<name>^{}`) are kept; everything
/// else is skipped. Order and duplicates are preserved.
pub fn parse_ls_remote(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let reference = line.split('\t').next_back()?.trim();
            PEELED_TAG
                .captures(reference)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}
