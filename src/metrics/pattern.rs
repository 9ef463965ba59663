//! Route pattern index.
//!
//! Every registered route pattern without a catch-all marker is compiled
//! into a [`PathMatcher`] and stored under the original pattern string,
//! which later becomes the `pathPattern` label.
//!
//! - `/:name` and `/{name}` placeholders match exactly one non-empty segment
//! - literal text is matched verbatim
//! - the match is anchored at both ends
//! - patterns containing `*` are not indexed at all (redirects, pingers)

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use crate::error::MetricsError;

/// `/:name` (application dialect) or `/{name}` (axum dialect).
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?::\w+|\{\w+\})").expect("static placeholder regex"));

/// Recognizes the concrete request paths that belong to one route pattern.
pub trait PathMatcher: Send + Sync + fmt::Debug {
    /// Returns true if the whole `path` belongs to this route.
    fn matches(&self, path: &str) -> bool;
}

/// Regex-backed matcher built from a route template.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn compile(pattern: &str) -> Result<Self, MetricsError> {
        let template = path_template(pattern);
        let regex = Regex::new(&template).map_err(|source| MetricsError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PathMatcher for RegexMatcher {
    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Turns `/users/:id` into `^/users/([^/]+)$`.
fn path_template(pattern: &str) -> String {
    let mut template = String::with_capacity(pattern.len() + 16);
    template.push('^');

    let mut last = 0;
    for placeholder in PLACEHOLDER.find_iter(pattern) {
        template.push_str(&regex::escape(&pattern[last..placeholder.start()]));
        template.push_str("/([^/]+)");
        last = placeholder.end();
    }
    template.push_str(&regex::escape(&pattern[last..]));

    template.push('$');
    template
}

/// Catch-all routes are never measured.
pub fn is_catch_all(pattern: &str) -> bool {
    pattern.contains('*')
}

struct IndexEntry {
    pattern: String,
    matcher: Box<dyn PathMatcher>,
}

/// Route pattern → matcher, in first-registration order.
///
/// Immutable once built, so concurrent requests read it without locking.
pub struct PatternIndex {
    entries: Vec<IndexEntry>,
}

impl PatternIndex {
    /// Builds the index with the regex matching strategy.
    pub fn build<I, P>(patterns: I) -> Result<Self, MetricsError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        Self::build_with(patterns, |pattern| {
            RegexMatcher::compile(pattern).map(|m| Box::new(m) as Box<dyn PathMatcher>)
        })
    }

    /// Builds the index with a caller supplied matcher factory.
    ///
    /// Fails on the first pattern the factory rejects; no partial index is
    /// returned.
    pub fn build_with<I, P, F>(patterns: I, mut compile: F) -> Result<Self, MetricsError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
        F: FnMut(&str) -> Result<Box<dyn PathMatcher>, MetricsError>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();

            if is_catch_all(pattern) {
                tracing::debug!(pattern, "Skipping catch-all route pattern");
                continue;
            }

            if !seen.insert(pattern.to_string()) {
                continue;
            }

            let matcher = compile(pattern)?;
            entries.push(IndexEntry {
                pattern: pattern.to_string(),
                matcher,
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.iter().any(|e| e.pattern == pattern)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.pattern.as_str())
    }

    /// Every indexed pattern whose matcher accepts the full `path`.
    pub fn matching<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.matcher.matches(path))
            .map(|e| e.pattern.as_str())
    }
}

impl fmt::Debug for PatternIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.pattern, &e.matcher)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(index: &PatternIndex, path: &str) -> Vec<String> {
        index.matching(path).map(str::to_string).collect()
    }

    #[test]
    fn indexes_each_plain_pattern_under_its_original_string() {
        let index = PatternIndex::build(["/api/self", "/users/:id", "/api/users/{id}"]).unwrap();

        assert_eq!(index.len(), 3);
        assert!(index.contains("/api/self"));
        assert!(index.contains("/users/:id"));
        assert!(index.contains("/api/users/{id}"));
    }

    #[test]
    fn skips_catch_all_patterns() {
        let index = PatternIndex::build(["/**", "/static/*", "/files/*path", "/api/self"]).unwrap();

        assert_eq!(index.patterns().collect::<Vec<_>>(), vec!["/api/self"]);
    }

    #[test]
    fn duplicate_patterns_collapse_to_one_entry() {
        // GET and POST on the same route register the pattern twice
        let index = PatternIndex::build(["/users/:id", "/users", "/users/:id"]).unwrap();

        assert_eq!(index.patterns().collect::<Vec<_>>(), vec!["/users/:id", "/users"]);
    }

    #[test]
    fn placeholder_matches_exactly_one_non_empty_segment() {
        let index = PatternIndex::build(["/users/:id"]).unwrap();

        assert_eq!(matches(&index, "/users/42"), vec!["/users/:id"]);
        assert!(matches(&index, "/users/").is_empty());
        assert!(matches(&index, "/users").is_empty());
        assert!(matches(&index, "/users/42/extra").is_empty());
        assert!(matches(&index, "/prefix/users/42").is_empty());
    }

    #[test]
    fn overlapping_patterns_only_match_their_own_shape() {
        let index = PatternIndex::build(["/a/:id", "/a/:id/b"]).unwrap();

        assert_eq!(matches(&index, "/a/5/b"), vec!["/a/:id/b"]);
        assert_eq!(matches(&index, "/a/5"), vec!["/a/:id"]);
    }

    #[test]
    fn ambiguous_patterns_all_match() {
        let index = PatternIndex::build(["/users/me", "/users/:id"]).unwrap();

        assert_eq!(matches(&index, "/users/me"), vec!["/users/me", "/users/:id"]);
    }

    #[test]
    fn literal_text_is_not_treated_as_regex() {
        let index = PatternIndex::build(["/api-docs/openapi.json", "/v1/items/:id.csv"]).unwrap();

        assert_eq!(matches(&index, "/api-docs/openapi.json"), vec!["/api-docs/openapi.json"]);
        assert!(matches(&index, "/api-docs/openapiXjson").is_empty());
        assert_eq!(matches(&index, "/v1/items/9.csv"), vec!["/v1/items/:id.csv"]);
    }

    #[test]
    fn template_is_anchored() {
        let matcher = RegexMatcher::compile("/teams/:team/members/:member").unwrap();

        assert_eq!(matcher.as_str(), "^/teams/([^/]+)/members/([^/]+)$");
        assert!(matcher.matches("/teams/red/members/7"));
        assert!(!matcher.matches("/teams/red/members/7/"));
    }

    #[test]
    fn rejected_pattern_fails_the_whole_build() {
        let result = PatternIndex::build_with(["/ok", "/broken"], |pattern| {
            if pattern == "/broken" {
                Err(MetricsError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source: regex::Error::Syntax("unbalanced".into()),
                })
            } else {
                RegexMatcher::compile(pattern).map(|m| Box::new(m) as Box<dyn PathMatcher>)
            }
        });

        match result {
            Err(MetricsError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "/broken"),
            other => panic!("expected InvalidPattern, got {:?}", other.map(|i| i.len())),
        }
    }

    #[derive(Debug)]
    struct Exact(String);

    impl PathMatcher for Exact {
        fn matches(&self, path: &str) -> bool {
            self.0 == path
        }
    }

    #[test]
    fn matching_strategy_is_swappable() {
        let index = PatternIndex::build_with(["/health", "/**"], |pattern| {
            Ok(Box::new(Exact(pattern.to_string())) as Box<dyn PathMatcher>)
        })
        .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(matches(&index, "/health"), vec!["/health"]);
    }
}
