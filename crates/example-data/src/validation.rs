//! Text validation mirroring the client's record rules.
//!
//! List names and todo descriptions must be non-blank once trimmed and at
//! most [`TEXT_MAX_CHARS`] characters long. Registries are checked against
//! these rules when parsed, so generated lists are always accepted.

/// Maximum length, in characters, of a list name or todo description.
pub const TEXT_MAX_CHARS: usize = 200;

/// Validates a list name or todo description.
///
/// # Examples
///
/// ```
/// use example_data::is_valid_text;
///
/// assert!(is_valid_text("Work Tasks"));
/// assert!(!is_valid_text("   "));
/// assert!(!is_valid_text(&"a".repeat(201)));
/// ```
#[must_use]
pub fn is_valid_text(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= TEXT_MAX_CHARS && trimmed == value
}

#[cfg(test)]
mod tests {
    //! Covers text validation behaviour.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("My First List", true)]
    #[case("a", true)]
    #[case("", false)]
    #[case("   ", false)]
    #[case(" padded ", false)]
    fn validates_text(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(is_valid_text(value), expected);
    }

    #[test]
    fn accepts_text_at_exact_max_length() {
        assert!(is_valid_text(&"a".repeat(TEXT_MAX_CHARS)));
    }

    #[test]
    fn rejects_text_over_max_length() {
        assert!(!is_valid_text(&"a".repeat(TEXT_MAX_CHARS + 1)));
    }
}
