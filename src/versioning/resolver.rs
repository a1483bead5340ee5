use crate::versioning::selector::Selector;
use semver::Version;
use std::cmp::Ordering;

/// Parses a tag name as a semantic version, tolerating a single `v` or `=` prefix.
pub fn parse_tag(tag: &str) -> Option<Version> {
    let tag = tag.trim();
    let stripped = tag
        .strip_prefix('v')
        .or_else(|| tag.strip_prefix('='))
        .unwrap_or(tag);
    Version::parse(stripped).ok()
}

/// Semantic-version precedence; build metadata does not take part.
pub fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

pub struct VersionResolver;

impl VersionResolver {
    /// Picks the highest tag accepted by `selector`, returning the tag as advertised.
    ///
    /// Tags that are not semantic versions are ignored. When two tags carry the same
    /// version, the one advertised first wins.
    pub fn resolve(selector: &Selector, tags: &[String]) -> Option<String> {
        let mut best: Option<(Version, &String)> = None;

        for tag in tags {
            let Some(version) = parse_tag(tag) else {
                continue;
            };
            if !selector.accepts(&version) {
                continue;
            }

            let replace = match &best {
                Some((current, _)) => precedence(&version, current) == Ordering::Greater,
                None => true,
            };
            if replace {
                best = Some((version, tag));
            }
        }

        best.map(|(_, tag)| tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case("latest", "1.2.0")]
    #[case("prerelease", "2.0.0-beta.1")]
    #[case("^1.0.0", "1.2.0")]
    fn resolves_documented_examples(#[case] selector: &str, #[case] expected: &str) {
        let available = tags(&["1.0.0", "1.2.0", "2.0.0-beta.1"]);
        let selector = Selector::parse(selector).unwrap();
        assert_eq!(
            VersionResolver::resolve(&selector, &available),
            Some(expected.to_string())
        );
    }

    #[rstest]
    #[case("latest")]
    #[case("prerelease")]
    #[case("^1.0.0")]
    #[case("*")]
    fn empty_tag_set_resolves_to_none(#[case] selector: &str) {
        let selector = Selector::parse(selector).unwrap();
        assert_eq!(VersionResolver::resolve(&selector, &[]), None);
    }

    #[test]
    fn keeps_original_tag_spelling() {
        let available = tags(&["v1.0.0", "v1.10.0", "v1.9.0"]);
        assert_eq!(
            VersionResolver::resolve(&Selector::Latest, &available),
            Some("v1.10.0".to_string())
        );
    }

    #[test]
    fn ignores_non_semver_tags() {
        let available = tags(&["release-2020", "1.0.1", "nightly"]);
        assert_eq!(
            VersionResolver::resolve(&Selector::Prerelease, &available),
            Some("1.0.1".to_string())
        );
    }

    #[test]
    fn first_spelling_wins_on_equal_versions() {
        let available = tags(&["1.2.0", "v1.2.0", "1.2.0+build.5"]);
        assert_eq!(
            VersionResolver::resolve(&Selector::Latest, &available),
            Some("1.2.0".to_string())
        );
    }

    #[test]
    fn stable_release_outranks_its_prereleases() {
        let available = tags(&["2.0.0-rc.2", "2.0.0", "2.0.0-rc.10"]);
        assert_eq!(
            VersionResolver::resolve(&Selector::Prerelease, &available),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn no_tag_satisfies_range() {
        let available = tags(&["1.0.0", "1.2.0"]);
        let selector = Selector::parse("^3.0.0").unwrap();
        assert_eq!(VersionResolver::resolve(&selector, &available), None);
    }
}
