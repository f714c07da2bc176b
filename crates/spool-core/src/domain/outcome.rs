//! Outcome model: what happened when a handler was invoked.

use std::fmt;

use thiserror::Error;

/// Ordinary failure returned by a handler.
///
/// Handlers report failure by value; the message ends up in the error log
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// Result of one contained handler invocation.
///
/// - `Success`: nothing further to do.
/// - `Failure`: the handler returned an error.
/// - `Panicked`: the handler unwound; the payload was turned into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
    Panicked(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Message destined for the error log, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(msg) | Outcome::Panicked(msg) => Some(msg),
        }
    }
}

impl From<Result<(), HandlerError>> for Outcome {
    fn from(result: Result<(), HandlerError>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(err) => Outcome::Failure(err.0),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure(msg) => write!(f, "failure: {msg}"),
            Outcome::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_result_maps_to_outcome() {
        assert_eq!(Outcome::from(Ok::<(), HandlerError>(())), Outcome::Success);
        assert_eq!(
            Outcome::from(Err::<(), _>(HandlerError::new("boom"))),
            Outcome::Failure("boom".to_string())
        );
    }

    #[test]
    fn only_failures_carry_a_message() {
        assert_eq!(Outcome::Success.error_message(), None);
        assert_eq!(Outcome::Failure("a".into()).error_message(), Some("a"));
        assert_eq!(Outcome::Panicked("b".into()).error_message(), Some("b"));
    }
}
