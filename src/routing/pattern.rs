//! Compiled route patterns.
//!
//! Patterns are compiled once at registration time so matching is pure
//! segment comparison, never parsing. The grammar is deliberately small:
//! literal segments, `:name` parameter segments, and a trailing greedy
//! wildcard written `*` or `(.*)`.

use std::collections::HashMap;

/// Extracted `:name` parameters for a matched path.
pub type Params = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// A route pattern compiled into its structural form.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a pattern. Compilation never fails: unrecognized tokens are
    /// taken as literals, and a wildcard is only greedy in trailing position.
    pub fn compile(pattern: &str) -> Self {
        let pieces: Vec<&str> = pattern
            .split('/')
            .filter(|piece| !piece.is_empty())
            .collect();
        let last = pieces.len().saturating_sub(1);

        let segments = pieces
            .iter()
            .enumerate()
            .map(|(index, piece)| {
                if index == last && (*piece == "*" || *piece == "(.*)") {
                    Segment::Wildcard
                } else if let Some(name) = piece.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal((*piece).to_string())
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Evaluate the pattern against a path. Returns the extracted parameters
    /// on match, `None` otherwise. Evaluation is deterministic: it depends
    /// only on the compiled segments and the path.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
        let mut params = Params::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard => return Some(params),
                Segment::Literal(literal) => {
                    if parts.get(index) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(index)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        if parts.len() == self.segments.len() {
            Some(params)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_exactly() {
        let pattern = RoutePattern::compile("/api/users");
        assert!(pattern.matches("/api/users").is_some());
        assert!(pattern.matches("/api/users/42").is_none());
        assert!(pattern.matches("/api").is_none());
        assert!(pattern.matches("/api/Users").is_none());
    }

    #[test]
    fn root_pattern_matches_only_root() {
        let pattern = RoutePattern::compile("/");
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("/anything").is_none());
    }

    #[test]
    fn param_segment_extracts_value() {
        let pattern = RoutePattern::compile("/api/users/:id");
        let params = pattern.matches("/api/users/42").expect("match");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn missing_param_segment_is_no_match() {
        let pattern = RoutePattern::compile("/api/users/:id");
        assert!(pattern.matches("/api/users").is_none());
        assert!(pattern.matches("/api/users/").is_none());
    }

    #[test]
    fn multiple_params_extract_in_place() {
        let pattern = RoutePattern::compile("/users/:user/groups/:group");
        let params = pattern.matches("/users/7/groups/admins").expect("match");
        assert_eq!(params.get("user").map(String::as_str), Some("7"));
        assert_eq!(params.get("group").map(String::as_str), Some("admins"));
    }

    #[test]
    fn trailing_wildcard_matches_zero_or_more_segments() {
        let pattern = RoutePattern::compile("/api/(.*)");
        assert!(pattern.matches("/api/users").is_some());
        assert!(pattern.matches("/api/users/5/groups").is_some());
        assert!(pattern.matches("/api/").is_some());
        assert!(pattern.matches("/apiary").is_none());
    }

    #[test]
    fn star_spelling_is_also_a_wildcard() {
        let pattern = RoutePattern::compile("/static/*");
        assert!(pattern.matches("/static/css/site.css").is_some());
        assert!(pattern.matches("/static").is_some());
        assert!(pattern.matches("/other").is_none());
    }

    #[test]
    fn wildcard_only_greedy_in_trailing_position() {
        let pattern = RoutePattern::compile("/a/*/b");
        assert!(pattern.matches("/a/*/b").is_some());
        assert!(pattern.matches("/a/x/b").is_none());
    }
}
