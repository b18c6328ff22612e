//! Text conditions used to route on model output

use crate::core::error::{ConfigurationError, PredicateError};
use crate::core::router::Predicate;
use regex::{Regex, RegexBuilder};

/// Pattern for matching model output (not serializable due to Regex)
#[derive(Debug, Clone)]
pub enum Condition {
    /// Case-insensitive substring match
    Contains(String),
    /// Case-insensitive whole-text match, ignoring surrounding whitespace
    Equals(String),
    /// Case-insensitive regular expression match
    Regex(Regex),
}

impl Condition {
    pub fn contains(needle: impl Into<String>) -> Self {
        Condition::Contains(needle.into().to_lowercase())
    }

    pub fn equals(expected: impl Into<String>) -> Self {
        Condition::Equals(expected.into().trim().to_lowercase())
    }

    pub fn regex(pattern: &str) -> Result<Self, ConfigurationError> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Condition::Regex)
            .map_err(|e| ConfigurationError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Check the condition against trimmed text; blank text cannot be classified
    pub fn matches(&self, text: &str) -> Result<bool, PredicateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PredicateError::new("cannot evaluate condition on empty text"));
        }
        Ok(match self {
            Condition::Contains(needle) => text.to_lowercase().contains(needle.as_str()),
            Condition::Equals(expected) => text.to_lowercase() == *expected,
            Condition::Regex(regex) => regex.is_match(text),
        })
    }
}

impl Predicate<String> for Condition {
    fn evaluate(&self, input: &String) -> Result<bool, PredicateError> {
        self.matches(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_ignores_case_and_whitespace() {
        let condition = Condition::contains("positive");
        assert!(condition.matches("  Positive\n").unwrap());
        assert!(!condition.matches("negative").unwrap());
    }

    #[test]
    fn test_equals_requires_whole_text() {
        let condition = Condition::equals("Neutral");
        assert!(condition.matches(" neutral ").unwrap());
        assert!(!condition.matches("mostly neutral").unwrap());
    }

    #[test]
    fn test_regex_pattern_matches() {
        let condition = Condition::regex(r"^(yes|ok)\b").unwrap();
        assert!(condition.matches("ok, ship it").unwrap());
        assert!(!condition.matches("not ok").unwrap());
    }

    #[test]
    fn test_regex_ignores_case_like_other_conditions() {
        let condition = Condition::regex(r"^positive\b").unwrap();
        assert!(condition.matches("Positive review").unwrap());
        assert!(condition.matches("POSITIVE").unwrap());
    }

    #[test]
    fn test_invalid_regex_is_configuration_error() {
        assert!(matches!(
            Condition::regex("(unclosed"),
            Err(ConfigurationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_blank_text_is_predicate_error() {
        assert!(Condition::contains("x").matches("   ").is_err());
    }
}
