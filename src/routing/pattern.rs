//! Route pattern compilation.
//!
//! # Responsibilities
//! - Extract `{name}` and `{name:regex}` tokens in left-to-right order
//! - Build an anchored matcher with one capture group per token
//! - Bind captured values to token names positionally
//!
//! # Design Decisions
//! - Leading/trailing `/` trimmed on both pattern and path
//! - Literal text between tokens is escaped, never interpreted as regex
//! - Custom regexes may not add capture groups (names and groups stay 1:1)
//! - Values are always strings; no type coercion
//! - Default `{name}` segments are ASCII-only; custom regexes keep the
//!   `regex` crate's Unicode classes

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(\w+)(?::([^}]+))?\}").expect("token regex is valid")
});

/// ASCII word characters; `\w` in `regex` would also accept Unicode letters.
const DEFAULT_SEGMENT: &str = r"[0-9A-Za-z_]+";

/// Error compiling a route pattern.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("route pattern '{pattern}' has an invalid regex: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("route pattern '{pattern}' declares {names} parameter(s) but its regex captures {groups}")]
    GroupCount {
        pattern: String,
        names: usize,
        groups: usize,
    },
}

/// Route parameters extracted from a matched path, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`. For a duplicated name the last binding wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A pattern compiled into a matcher plus its ordered parameter names.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    parameter_names: Vec<String>,
    matcher: Regex,
}

impl CompiledPattern {
    /// Compile a raw route pattern.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = trim_slashes(pattern);
        let mut parameter_names = Vec::new();
        let mut body = String::with_capacity(trimmed.len() + 8);
        let mut last = 0;

        for caps in TOKEN.captures_iter(trimmed) {
            let whole = caps.get(0).expect("group 0 always participates");
            body.push_str(&regex::escape(&trimmed[last..whole.start()]));

            parameter_names.push(caps[1].to_string());
            let segment = caps.get(2).map_or(DEFAULT_SEGMENT, |m| m.as_str());
            body.push('(');
            body.push_str(segment);
            body.push(')');

            last = whole.end();
        }
        body.push_str(&regex::escape(&trimmed[last..]));

        let matcher = Regex::new(&format!("^{body}$")).map_err(|source| {
            PatternError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        let groups = matcher.captures_len() - 1;
        if groups != parameter_names.len() {
            return Err(PatternError::GroupCount {
                pattern: pattern.to_string(),
                names: parameter_names.len(),
                groups,
            });
        }

        Ok(Self {
            parameter_names,
            matcher,
        })
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Match `path` (trimmed here) and bind captured values to parameter names.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let caps = self.matcher.captures(trim_slashes(path))?;
        Some(
            self.parameter_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = caps.get(i + 1).map_or("", |m| m.as_str());
                    (name.clone(), value.to_string())
                })
                .collect(),
        )
    }
}

/// Strip leading and trailing path separators.
pub fn trim_slashes(path: &str) -> &str {
    path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tokens() {
        let p = CompiledPattern::compile("/users/{id}/posts/{slug}").unwrap();
        assert_eq!(p.parameter_names(), ["id", "slug"]);

        let params = p.captures("/users/42/posts/hello_world").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("slug"), Some("hello_world"));
        assert_eq!(params.names().collect::<Vec<_>>(), ["id", "slug"]);
    }

    #[test]
    fn test_default_segment_is_ascii() {
        let p = CompiledPattern::compile("/users/{id}").unwrap();
        assert!(p.captures("/users/é").is_none());
        assert!(p.captures("/users/caf\u{e9}").is_none());
        assert_eq!(p.captures("/users/Ab_9").unwrap().get("id"), Some("Ab_9"));
    }

    #[test]
    fn test_custom_regex_token() {
        let p = CompiledPattern::compile("/users/{id:\\d+}").unwrap();
        assert!(p.captures("/users/42").is_some());
        assert!(p.captures("/users/abc").is_none());
    }

    #[test]
    fn test_anchored() {
        let p = CompiledPattern::compile("/users/{id}").unwrap();
        assert!(p.captures("/users/42/edit").is_none());
        assert!(p.captures("/admin/users/42").is_none());
    }

    #[test]
    fn test_trimming_invariance() {
        let p = CompiledPattern::compile("users/{id}/").unwrap();
        assert_eq!(p.captures("/users/7").unwrap().get("id"), Some("7"));
        assert_eq!(p.captures("users/7/").unwrap().get("id"), Some("7"));
    }

    #[test]
    fn test_literal_pattern() {
        let p = CompiledPattern::compile("/about/team").unwrap();
        assert!(p.parameter_names().is_empty());
        assert!(p.captures("/about/team").unwrap().is_empty());
        assert!(p.captures("/about/teams").is_none());
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let p = CompiledPattern::compile("/files/{name}.txt").unwrap();
        assert_eq!(p.captures("/files/notes.txt").unwrap().get("name"), Some("notes"));
        assert!(p.captures("/files/notesXtxt").is_none());
    }

    #[test]
    fn test_invalid_regex() {
        let err = CompiledPattern::compile("/users/{id:[0-9}").unwrap_err();
        assert!(matches!(err, PatternError::InvalidRegex { .. }));
    }

    #[test]
    fn test_extra_capture_groups_rejected() {
        let err = CompiledPattern::compile("/files/{kind:(img|doc)}").unwrap_err();
        assert!(matches!(err, PatternError::GroupCount { names: 1, groups: 2, .. }));

        // Non-capturing groups are fine.
        let p = CompiledPattern::compile("/files/{kind:(?:img|doc)}").unwrap();
        assert_eq!(p.captures("/files/doc").unwrap().get("kind"), Some("doc"));
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let p = CompiledPattern::compile("/{a}/{a}").unwrap();
        assert_eq!(p.captures("/x/y").unwrap().get("a"), Some("y"));
    }
}
