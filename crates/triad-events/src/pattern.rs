//! Exact and prefix event names.

use std::fmt;

use crate::error::{EventError, EventResult};

/// Trailing marker that turns a registration into a prefix subscription.
pub const PREFIX_MARKER: char = '*';

/// A parsed registration target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPattern {
    /// Matches only events published under this exact name.
    Exact(String),
    /// Matches every event whose name starts with this prefix, including
    /// the prefix itself. The empty prefix matches every event.
    Prefix(String),
}

impl EventPattern {
    /// Parse a registration name.
    ///
    /// A single trailing [`PREFIX_MARKER`] is stripped and makes the
    /// pattern a prefix; any other `*` is literal.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::EmptyEventName`] if `name` is empty.
    pub fn parse(name: &str) -> EventResult<Self> {
        if name.is_empty() {
            return Err(EventError::EmptyEventName);
        }
        Ok(match name.strip_suffix(PREFIX_MARKER) {
            Some(prefix) => Self::Prefix(prefix.to_owned()),
            None => Self::Exact(name.to_owned()),
        })
    }

    /// Check whether a published event name matches this pattern.
    #[must_use]
    pub fn matches(&self, event: &str) -> bool {
        match self {
            Self::Exact(name) => name == event,
            Self::Prefix(prefix) => event.starts_with(prefix.as_str()),
        }
    }

    /// Whether this is a prefix subscription.
    #[must_use]
    pub fn is_prefix(&self) -> bool {
        matches!(self, Self::Prefix(_))
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(prefix) => write!(f, "{prefix}{PREFIX_MARKER}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact() {
        let pattern = EventPattern::parse("user.created").unwrap();
        assert_eq!(pattern, EventPattern::Exact("user.created".into()));
        assert!(!pattern.is_prefix());
    }

    #[test]
    fn test_parse_prefix() {
        let pattern = EventPattern::parse("user.*").unwrap();
        assert_eq!(pattern, EventPattern::Prefix("user.".into()));
        assert!(pattern.is_prefix());
        assert_eq!(pattern.to_string(), "user.*");
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert_eq!(EventPattern::parse(""), Err(EventError::EmptyEventName));
    }

    #[test]
    fn test_bare_marker_matches_everything() {
        let pattern = EventPattern::parse("*").unwrap();
        assert_eq!(pattern, EventPattern::Prefix(String::new()));
        assert!(pattern.matches("anything"));
        assert!(pattern.matches(""));
    }

    #[test]
    fn test_only_trailing_marker_is_special() {
        let pattern = EventPattern::parse("a*b").unwrap();
        assert_eq!(pattern, EventPattern::Exact("a*b".into()));

        let pattern = EventPattern::parse("a**").unwrap();
        assert_eq!(pattern, EventPattern::Prefix("a*".into()));
        assert!(pattern.matches("a*c"));
        assert!(!pattern.matches("abc"));
    }

    #[test]
    fn test_prefix_matches_itself() {
        let pattern = EventPattern::parse("order*").unwrap();
        assert!(pattern.matches("order"));
        assert!(pattern.matches("order.paid"));
        assert!(!pattern.matches("orde"));
    }
}
