//! Command tree dispatch engine.
//!
//! Resolves prefixed text commands against an immutable tree of command nodes,
//! binds the remaining tokens to one of several overloaded subcommand
//! definitions, invokes its handler, and computes completions for partially
//! typed input.
//!
//! # Pipeline
//!
//! Invocation runs `tokenize → resolve command → resolve subcommand →
//! permission → preconditions → cooldown → bind → invoke`. Any engine error
//! aborts the run and is routed to the handler registered for its
//! [`ErrorKind`], or returned when none is registered.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cmdtree_engine::prelude::*;
//!
//! let dispatcher = Dispatcher::builder()
//!     .command(
//!         CommandNode::builder("add").default_overload(
//!             SubcommandDefinition::builder()
//!                 .param(ParameterSpec::new("a", ValueType::INTEGER))
//!                 .param(ParameterSpec::new("b", ValueType::INTEGER))
//!                 .handler(|args| Ok(Some(Value::Integer(args.integer(0)? + args.integer(1)?)))),
//!         ),
//!     )
//!     .build()?;
//!
//! let sender: Arc<dyn Sender> = Arc::new(BasicSender::new("console", ValueType::SENDER));
//! let outcome = dispatcher.invoke(&sender, "/add 2 3")?;
//! assert_eq!(outcome.value(), Some(&Value::Integer(5)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod parser;
pub mod provider;
pub mod resolver;
pub mod sender;
pub mod suggest;
pub mod tokenizer;
pub mod tree;
pub mod validator;
pub mod value;

// Re-exports for convenience
pub use binder::ArgumentBinder;
pub use config::{DEFAULT_PREFIX, EngineConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder, ErrorHandler, InvocationOutcome};
pub use error::{ConfigError, DispatchError, ErrorKind, HandlerError, InvocationError};
pub use gate::{
    AllowAll, CooldownGate, InMemoryCooldowns, MetadataPermissionGate, PermissionGate,
    PermissionTarget,
};
pub use parser::{ArgumentParser, ChoiceParser, ParserRegistry};
pub use provider::{StaticSuggestions, SuggestionProvider, SuggestionRegistry};
pub use sender::{BasicSender, Sender};
pub use suggest::SuggestionEngine;
pub use tokenizer::TokenizedInput;
pub use tree::{
    CommandHandler, CommandNode, CommandNodeBuilder, CommandTree, Constraint, Metadata,
    ParameterSpec, Precondition, SubcommandBuilder, SubcommandDefinition, SubcommandGroup,
};
pub use validator::{Validator, ValidatorRegistry};
pub use value::{Arguments, Value, ValueType};

/// Everything needed to declare a tree and run it.
pub mod prelude {
    pub use crate::{
        Arguments, BasicSender, CommandNode, Dispatcher, DispatchError, ErrorKind, HandlerError,
        InvocationError, InvocationOutcome, ParameterSpec, Sender, SubcommandDefinition, Value,
        ValueType,
    };
}
