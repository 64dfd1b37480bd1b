//! Error types for invocation, configuration and handler bodies.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::value::ValueType;

/// Errors raised while turning input into a handler call.
///
/// Every variant has an [`ErrorKind`]; the dispatcher routes errors to the
/// handler registered for that exact kind.
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// Input does not start with the command prefix.
    #[error("input does not start with the command prefix '{prefix}'")]
    PlainText { prefix: String },

    /// No root command matches the first token.
    #[error("unknown command '{name}'")]
    CommandNotFound { name: String },

    /// The resolved group has no definitions.
    #[error("'{command}' has no matching subcommand")]
    SubcommandNotFound { command: String },

    /// Every definition in the group was rejected by arity.
    #[error(
        "wrong number of arguments ({provided}) for '{command}', expected: {}",
        .rejected.join(" | ")
    )]
    IncorrectArgumentCount {
        command: String,
        provided: usize,
        /// Signatures of the rejected definitions.
        rejected: Vec<String>,
    },

    /// The sender cannot fill the declared sender slot.
    #[error("'{subcommand}' must be run by {expected}, not {actual}")]
    SenderTypeMismatch {
        subcommand: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// A token could not be converted.
    #[error("invalid value '{token}' for '{parameter}': {message}")]
    ArgumentParse {
        parameter: String,
        token: String,
        message: String,
    },

    /// A converted value failed one of its constraints.
    #[error("value for '{parameter}' violates {constraint}: {message}")]
    ArgumentValidation {
        parameter: String,
        constraint: String,
        message: String,
    },

    /// The permission gate vetoed the command or subcommand.
    #[error("not enough permission to use '{target}'")]
    NotEnoughPermission { target: String },

    /// A precondition attached to the command returned false.
    #[error("precondition failed for '{command}'")]
    BeforeCommandFailed { command: String },

    /// The cooldown gate reported a remaining wait.
    #[error("'{command}' is on cooldown for another {:.1}s", .remaining.as_secs_f64())]
    OnCooldown { command: String, remaining: Duration },
}

/// Discriminant of [`InvocationError`], used to key error handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PlainText,
    CommandNotFound,
    SubcommandNotFound,
    IncorrectArgumentCount,
    SenderTypeMismatch,
    ArgumentParse,
    ArgumentValidation,
    NotEnoughPermission,
    BeforeCommandFailed,
    OnCooldown,
}

impl ErrorKind {
    /// Returns all kinds.
    pub fn all() -> &'static [ErrorKind] {
        &[
            ErrorKind::PlainText,
            ErrorKind::CommandNotFound,
            ErrorKind::SubcommandNotFound,
            ErrorKind::IncorrectArgumentCount,
            ErrorKind::SenderTypeMismatch,
            ErrorKind::ArgumentParse,
            ErrorKind::ArgumentValidation,
            ErrorKind::NotEnoughPermission,
            ErrorKind::BeforeCommandFailed,
            ErrorKind::OnCooldown,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PlainText => "plain_text",
            ErrorKind::CommandNotFound => "command_not_found",
            ErrorKind::SubcommandNotFound => "subcommand_not_found",
            ErrorKind::IncorrectArgumentCount => "incorrect_argument_count",
            ErrorKind::SenderTypeMismatch => "sender_type_mismatch",
            ErrorKind::ArgumentParse => "argument_parse",
            ErrorKind::ArgumentValidation => "argument_validation",
            ErrorKind::NotEnoughPermission => "not_enough_permission",
            ErrorKind::BeforeCommandFailed => "before_command_failed",
            ErrorKind::OnCooldown => "on_cooldown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InvocationError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::PlainText { .. } => ErrorKind::PlainText,
            InvocationError::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            InvocationError::SubcommandNotFound { .. } => ErrorKind::SubcommandNotFound,
            InvocationError::IncorrectArgumentCount { .. } => ErrorKind::IncorrectArgumentCount,
            InvocationError::SenderTypeMismatch { .. } => ErrorKind::SenderTypeMismatch,
            InvocationError::ArgumentParse { .. } => ErrorKind::ArgumentParse,
            InvocationError::ArgumentValidation { .. } => ErrorKind::ArgumentValidation,
            InvocationError::NotEnoughPermission { .. } => ErrorKind::NotEnoughPermission,
            InvocationError::BeforeCommandFailed { .. } => ErrorKind::BeforeCommandFailed,
            InvocationError::OnCooldown { .. } => ErrorKind::OnCooldown,
        }
    }

    /// Create a permission veto for `target`.
    pub fn not_enough_permission(target: impl Into<String>) -> Self {
        Self::NotEnoughPermission {
            target: target.into(),
        }
    }
}

/// Programming errors in the command tree or registries.
///
/// These are never routed through the error-handler map.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Alias is empty or contains whitespace.
    #[error("invalid alias '{0}'")]
    InvalidAlias(String),

    /// Two siblings share an alias.
    #[error("alias '{alias}' is registered twice under {scope}")]
    DuplicateAlias { scope: String, alias: String },

    /// A named subcommand was registered without an alias.
    #[error("named subcommand under '{command}' declares no alias")]
    MissingAlias { command: String },

    /// A default overload was registered with aliases.
    #[error("default overload under '{command}' must not declare aliases")]
    AliasedDefault { command: String },

    /// A variadic parameter is not the last one.
    #[error("'{definition}': variadic parameter '{parameter}' must be last")]
    VariadicNotLast {
        definition: String,
        parameter: String,
    },

    /// A definition declares more than one sender slot.
    #[error("'{definition}' declares more than one sender parameter")]
    MultipleSenders { definition: String },

    /// The sender slot was marked variadic.
    #[error("'{definition}': sender parameter '{parameter}' cannot be variadic")]
    VariadicSender {
        definition: String,
        parameter: String,
    },

    /// A non-text parameter has no parser.
    #[error("no default parser registered for value type '{0}'")]
    MissingDefaultParser(ValueType),

    /// Explicit parser id is not registered.
    #[error("parser '{0}' is not registered")]
    UnknownParser(String),

    /// Explicit suggestion provider id is not registered.
    #[error("suggestion provider '{0}' is not registered")]
    UnknownSuggestionProvider(String),

    /// Constraint refers to an unregistered validator.
    #[error("validator '{0}' is not registered")]
    UnknownValidator(String),

    /// Constraint argument rejected by its validator.
    #[error("invalid argument for constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error returned by a handler body.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An engine error; dispatched like any pipeline error.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Anything else; propagated to the caller untouched.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error returned to the caller of [`crate::Dispatcher::invoke`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// An engine error with no registered handler for its kind.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// A foreign error raised by the handler body.
    #[error(transparent)]
    Handler(anyhow::Error),

    /// A configuration error hit during binding.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Invocation(err) => DispatchError::Invocation(err),
            HandlerError::Other(err) => DispatchError::Handler(err),
        }
    }
}

impl DispatchError {
    /// The engine error kind, if this is an engine error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DispatchError::Invocation(err) => Some(err.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = InvocationError::OnCooldown {
            command: "roll".to_string(),
            remaining: Duration::from_millis(1500),
        };
        assert_eq!(err.kind(), ErrorKind::OnCooldown);
        assert_eq!(err.to_string(), "'roll' is on cooldown for another 1.5s");
    }

    #[test]
    fn test_incorrect_count_message() {
        let err = InvocationError::IncorrectArgumentCount {
            command: "math".to_string(),
            provided: 3,
            rejected: vec!["add <a> <b>".to_string(), "neg <a>".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "wrong number of arguments (3) for 'math', expected: add <a> <b> | neg <a>"
        );
    }

    #[test]
    fn test_handler_error_conversion() {
        let engine: DispatchError = HandlerError::from(InvocationError::not_enough_permission("x")).into();
        assert_eq!(engine.kind(), Some(ErrorKind::NotEnoughPermission));

        let foreign: DispatchError = HandlerError::from(anyhow::anyhow!("boom")).into();
        assert!(matches!(foreign, DispatchError::Handler(_)));
        assert_eq!(foreign.kind(), None);
    }

    #[test]
    fn test_all_kinds_distinct() {
        let kinds: std::collections::HashSet<_> = ErrorKind::all().iter().collect();
        assert_eq!(kinds.len(), ErrorKind::all().len());
    }
}
