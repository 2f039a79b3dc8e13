//! Topic routing-key patterns.
//!
//! Dot-delimited patterns with the broker's topic-matching rules: `*`
//! matches exactly one segment, `#` matches zero or more. The pattern is
//! validated once at startup and immutable for the process lifetime; the
//! broker does the authoritative matching, [`RoutingKey::matches`] exists
//! for diagnostics and tests.

use std::fmt;

use thiserror::Error;

/// A validated topic pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingKey(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingKeyError {
    #[error("routing key is empty")]
    Empty,

    #[error("routing key has an empty segment: {0:?}")]
    EmptySegment(String),

    /// `*` and `#` are only valid as whole segments.
    #[error("wildcard must be a whole segment: {0:?}")]
    EmbeddedWildcard(String),
}

impl RoutingKey {
    pub fn parse(pattern: &str) -> Result<Self, RoutingKeyError> {
        if pattern.is_empty() {
            return Err(RoutingKeyError::Empty);
        }
        for segment in pattern.split('.') {
            if segment.is_empty() {
                return Err(RoutingKeyError::EmptySegment(pattern.to_string()));
            }
            if segment.len() > 1 && (segment.contains('*') || segment.contains('#')) {
                return Err(RoutingKeyError::EmbeddedWildcard(pattern.to_string()));
            }
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a concrete routing key matches this pattern.
    pub fn matches(&self, key: &str) -> bool {
        let pattern: Vec<&str> = self.0.split('.').collect();
        let key: Vec<&str> = key.split('.').collect();
        segments_match(&pattern, &key)
    }
}

fn segments_match(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| segments_match(rest, &key[skip..])),
        Some((&seg, rest)) => match key.split_first() {
            Some((&first, key_rest)) => {
                (seg == "*" || seg == first) && segments_match(rest, key_rest)
            }
            None => false,
        },
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(pattern: &str) -> RoutingKey {
        RoutingKey::parse(pattern).unwrap()
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(RoutingKey::parse(""), Err(RoutingKeyError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert!(matches!(
            RoutingKey::parse("scmb..alerts"),
            Err(RoutingKeyError::EmptySegment(_))
        ));
        assert!(matches!(
            RoutingKey::parse("scmb.alerts."),
            Err(RoutingKeyError::EmptySegment(_))
        ));
    }

    #[test]
    fn test_parse_rejects_embedded_wildcard() {
        assert!(matches!(
            RoutingKey::parse("scmb.alert*.x"),
            Err(RoutingKeyError::EmbeddedWildcard(_))
        ));
    }

    #[test]
    fn test_parse_accepts_wildcards_as_segments() {
        key("scmb.#");
        key("scmb.*.created");
        key("#");
    }

    #[test]
    fn test_exact_match() {
        let k = key("scmb.alerts.created");
        assert!(k.matches("scmb.alerts.created"));
        assert!(!k.matches("scmb.alerts.updated"));
        assert!(!k.matches("scmb.alerts"));
    }

    #[test]
    fn test_star_matches_exactly_one_segment() {
        let k = key("scmb.resource-alerts.*");
        assert!(k.matches("scmb.resource-alerts.created"));
        assert!(k.matches("scmb.resource-alerts.updated"));
        assert!(!k.matches("scmb.other.x"));
        assert!(!k.matches("scmb.resource-alerts"));
        assert!(!k.matches("scmb.resource-alerts.created.extra"));
    }

    #[test]
    fn test_hash_matches_zero_or_more_segments() {
        let k = key("scmb.#");
        assert!(k.matches("scmb"));
        assert!(k.matches("scmb.alerts"));
        assert!(k.matches("scmb.alerts.created.deep"));
        assert!(!k.matches("other.alerts"));
    }

    #[test]
    fn test_hash_in_the_middle() {
        let k = key("scmb.#.created");
        assert!(k.matches("scmb.created"));
        assert!(k.matches("scmb.alerts.created"));
        assert!(k.matches("scmb.a.b.created"));
        assert!(!k.matches("scmb.alerts.updated"));
    }
}
