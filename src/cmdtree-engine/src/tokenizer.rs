//! Prefix check and whitespace tokenization shared by invocation and suggestion.

use smallvec::SmallVec;

use crate::error::InvocationError;

/// Tokens of one input line, borrowed from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedInput<'a> {
    tokens: SmallVec<[&'a str; 8]>,
    trailing_whitespace: bool,
}

impl<'a> TokenizedInput<'a> {
    /// Strips `prefix` and splits the rest on runs of whitespace.
    ///
    /// Fails with [`InvocationError::PlainText`] when `input` does not begin with
    /// `prefix`, whatever else it contains.
    pub fn parse(input: &'a str, prefix: &str) -> Result<Self, InvocationError> {
        let body = input
            .strip_prefix(prefix)
            .ok_or_else(|| InvocationError::PlainText {
                prefix: prefix.to_string(),
            })?;

        Ok(Self {
            tokens: body.split_whitespace().collect(),
            trailing_whitespace: body.ends_with(char::is_whitespace),
        })
    }

    pub fn tokens(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Whether the input ends in whitespace, i.e. a new empty token has started.
    pub fn trailing_whitespace(&self) -> bool {
        self.trailing_whitespace
    }

    /// Tokens for completion: an empty pending token is appended after trailing whitespace.
    pub fn completion_tokens(&self) -> SmallVec<[&'a str; 8]> {
        let mut tokens = self.tokens.clone();
        if self.trailing_whitespace {
            tokens.push("");
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_prefix() {
        assert!(matches!(
            TokenizedInput::parse("test", "/"),
            Err(InvocationError::PlainText { .. })
        ));
        assert!(matches!(
            TokenizedInput::parse(" /test", "/"),
            Err(InvocationError::PlainText { .. })
        ));
    }

    #[test]
    fn test_splits_whitespace_runs() {
        let input = TokenizedInput::parse("/cmd   a \t b", "/").unwrap();
        assert_eq!(input.tokens(), &["cmd", "a", "b"]);
        assert!(!input.trailing_whitespace());
    }

    #[test]
    fn test_trailing_whitespace_adds_pending_token() {
        let input = TokenizedInput::parse("/test ", "/").unwrap();
        assert_eq!(input.tokens(), &["test"]);
        assert!(input.trailing_whitespace());
        assert_eq!(input.completion_tokens().as_slice(), &["test", ""]);
    }

    #[test]
    fn test_empty_body() {
        let input = TokenizedInput::parse("/", "/").unwrap();
        assert!(input.tokens().is_empty());
        assert!(input.completion_tokens().is_empty());
    }

    #[test]
    fn test_multi_character_prefix() {
        let input = TokenizedInput::parse("!!go now", "!!").unwrap();
        assert_eq!(input.tokens(), &["go", "now"]);
    }
}
