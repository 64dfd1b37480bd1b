//! The invocation pipeline and its builder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::binder::ArgumentBinder;
use crate::config::EngineConfig;
use crate::error::{ConfigError, DispatchError, ErrorKind, InvocationError};
use crate::gate::{AllowAll, CooldownGate, PermissionGate, PermissionTarget};
use crate::parser::{ArgumentParser, ParserRegistry};
use crate::provider::{SuggestionProvider, SuggestionRegistry};
use crate::resolver;
use crate::sender::Sender;
use crate::suggest::SuggestionEngine;
use crate::tokenizer::TokenizedInput;
use crate::tree::{CommandNode, CommandNodeBuilder, CommandTree, SubcommandDefinition};
use crate::validator::{Validator, ValidatorRegistry};
use crate::value::{Value, ValueType};

/// Callback registered for one [`ErrorKind`].
pub type ErrorHandler = Arc<dyn Fn(&InvocationError, &dyn Sender) + Send + Sync>;

/// Successful result of [`Dispatcher::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    /// The handler ran and returned this value.
    Completed(Option<Value>),
    /// An engine error occurred and the handler registered for its kind consumed it.
    Handled(ErrorKind),
}

impl InvocationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, InvocationOutcome::Completed(_))
    }

    /// The handler's return value, if it ran and returned one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            InvocationOutcome::Completed(value) => value.as_ref(),
            InvocationOutcome::Handled(_) => None,
        }
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Tokenize,
    ResolveCommand,
    ResolveSubcommand,
    PermissionCheck,
    PreconditionCheck,
    CooldownCheck,
    BindArguments,
    Invoke,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Tokenize => "tokenize",
            Stage::ResolveCommand => "resolve_command",
            Stage::ResolveSubcommand => "resolve_subcommand",
            Stage::PermissionCheck => "permission_check",
            Stage::PreconditionCheck => "precondition_check",
            Stage::CooldownCheck => "cooldown_check",
            Stage::BindArguments => "bind_arguments",
            Stage::Invoke => "invoke",
        }
    }
}

struct Inner {
    tree: CommandTree,
    parsers: ParserRegistry,
    validators: ValidatorRegistry,
    suggestions: SuggestionRegistry,
    permissions: Arc<dyn PermissionGate>,
    cooldowns: Option<Arc<dyn CooldownGate>>,
    error_handlers: HashMap<ErrorKind, ErrorHandler>,
    config: EngineConfig,
}

/// Resolves, binds and invokes commands against an immutable tree.
///
/// Cloning is cheap and clones share the same tree and registries.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn tree(&self) -> &CommandTree {
        &self.inner.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Runs `input` on behalf of `sender`.
    ///
    /// Engine errors go to the handler registered for their kind and come back
    /// as [`InvocationOutcome::Handled`]; without one they are returned as
    /// [`DispatchError::Invocation`]. Foreign handler errors and configuration
    /// errors are always returned.
    pub fn invoke(
        &self,
        sender: &Arc<dyn Sender>,
        input: &str,
    ) -> Result<InvocationOutcome, DispatchError> {
        let mut stage = Stage::Tokenize;
        match self.run(sender, input, &mut stage) {
            Ok(value) => {
                debug!(sender = sender.id(), input, "invocation completed");
                Ok(InvocationOutcome::Completed(value))
            }
            Err(DispatchError::Invocation(err)) => {
                debug!(stage = stage.as_str(), error = %err, "invocation aborted");
                self.dispatch_error(err, sender.as_ref())
            }
            Err(err) => {
                debug!(stage = stage.as_str(), error = %err, "invocation failed");
                Err(err)
            }
        }
    }

    fn run(
        &self,
        sender: &Arc<dyn Sender>,
        input: &str,
        stage: &mut Stage,
    ) -> Result<Option<Value>, DispatchError> {
        let inner = &*self.inner;

        let tokenized = TokenizedInput::parse(input, &inner.config.prefix)?;

        *stage = Stage::ResolveCommand;
        let (node, rest) = resolver::resolve_command(&inner.tree, tokenized.tokens())?;

        // A vetoed node must not leak its groups or signatures.
        *stage = Stage::PermissionCheck;
        inner
            .permissions
            .check(sender.as_ref(), PermissionTarget::Command(node))?;

        *stage = Stage::ResolveSubcommand;
        let (group, arguments) = resolver::resolve_subcommand_group(node, rest)?;
        let candidates = resolver::filter_by_arity(node, group, arguments.len())?;

        *stage = Stage::PermissionCheck;
        let mut denied = None;
        let permitted: Vec<_> = candidates
            .into_iter()
            .filter(|definition| {
                match inner
                    .permissions
                    .check(sender.as_ref(), PermissionTarget::Subcommand(definition))
                {
                    Ok(()) => true,
                    Err(err) => {
                        denied = Some(err);
                        false
                    }
                }
            })
            .collect();
        if permitted.is_empty() {
            return Err(denied
                .unwrap_or_else(|| InvocationError::not_enough_permission(node.path()))
                .into());
        }

        *stage = Stage::PreconditionCheck;
        if !node
            .preconditions()
            .iter()
            .all(|guard| guard(sender.as_ref(), node.as_ref()))
        {
            return Err(InvocationError::BeforeCommandFailed {
                command: node.path().to_string(),
            }
            .into());
        }

        *stage = Stage::CooldownCheck;
        if node.metadata().cooldown.is_some()
            && let Some(cooldowns) = &inner.cooldowns
        {
            let remaining = cooldowns.remaining(sender.as_ref(), node);
            if !remaining.is_zero() {
                return Err(InvocationError::OnCooldown {
                    command: node.path().to_string(),
                    remaining,
                }
                .into());
            }
        }

        *stage = Stage::BindArguments;
        let binder = ArgumentBinder::new(&inner.parsers, &inner.validators);
        let (definition, args) = binder.bind_first(node, &permitted, sender, arguments)?;

        *stage = Stage::Invoke;
        let value = definition.handler().call(args)?;

        if let Some(cooldowns) = &inner.cooldowns {
            cooldowns.record(sender.as_ref(), node);
        }
        Ok(value)
    }

    fn dispatch_error(
        &self,
        err: InvocationError,
        sender: &dyn Sender,
    ) -> Result<InvocationOutcome, DispatchError> {
        let kind = err.kind();
        match self.inner.error_handlers.get(&kind) {
            Some(handler) => {
                handler(&err, sender);
                Ok(InvocationOutcome::Handled(kind))
            }
            None => {
                warn!(kind = kind.as_str(), error = %err, "no handler registered for error");
                Err(err.into())
            }
        }
    }

    /// Completions for partially typed `input`.
    pub fn suggest(&self, sender: &dyn Sender, input: &str) -> Result<Vec<String>, InvocationError> {
        let inner = &*self.inner;
        SuggestionEngine::new(
            &inner.tree,
            &inner.suggestions,
            inner.permissions.as_ref(),
            &inner.config.prefix,
        )
        .with_limit(inner.config.suggestion_limit)
        .suggest(sender, input)
    }

    /// Root lookup plus greedy descent; see [`resolver::resolve_command`].
    pub fn resolve_command<'a, T: AsRef<str>>(
        &self,
        tokens: &'a [T],
    ) -> Result<(&Arc<CommandNode>, &'a [T]), InvocationError> {
        resolver::resolve_command(&self.inner.tree, tokens)
    }

    /// Group selection for `node`; see [`resolver::resolve_subcommand_group`].
    pub fn resolve_subcommands<'n, 'a, T: AsRef<str>>(
        &self,
        node: &'n CommandNode,
        tokens: &'a [T],
    ) -> Result<(&'n [Arc<SubcommandDefinition>], &'a [T]), InvocationError> {
        resolver::resolve_subcommand_group(node, tokens)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handled: Vec<_> = self.inner.error_handlers.keys().map(|k| k.as_str()).collect();
        handled.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("tree", &self.inner.tree)
            .field("parsers", &self.inner.parsers)
            .field("validators", &self.inner.validators)
            .field("suggestions", &self.inner.suggestions)
            .field("cooldowns", &self.inner.cooldowns.is_some())
            .field("error_handlers", &handled)
            .field("config", &self.inner.config)
            .finish()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Collects the tree, registries, gates and error handlers of a [`Dispatcher`].
pub struct DispatcherBuilder {
    roots: Vec<CommandNodeBuilder>,
    parsers: ParserRegistry,
    validators: ValidatorRegistry,
    suggestions: SuggestionRegistry,
    permissions: Arc<dyn PermissionGate>,
    cooldowns: Option<Arc<dyn CooldownGate>>,
    error_handlers: HashMap<ErrorKind, ErrorHandler>,
    config: EngineConfig,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            parsers: ParserRegistry::with_builtins(),
            validators: ValidatorRegistry::with_builtins(),
            suggestions: SuggestionRegistry::with_builtins(),
            permissions: Arc::new(AllowAll),
            cooldowns: None,
            error_handlers: HashMap::new(),
            config: EngineConfig::default(),
        }
    }
}

impl DispatcherBuilder {
    /// Adds a root command.
    pub fn command(mut self, root: CommandNodeBuilder) -> Self {
        self.roots.push(root);
        self
    }

    pub fn commands(mut self, roots: impl IntoIterator<Item = CommandNodeBuilder>) -> Self {
        self.roots.extend(roots);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = prefix.into();
        self
    }

    /// Replaces the parser registry, built-ins included.
    pub fn parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    pub fn suggestions(mut self, suggestions: SuggestionRegistry) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Sets the default parser for `value_type`.
    pub fn parser(mut self, value_type: ValueType, parser: impl ArgumentParser + 'static) -> Self {
        self.parsers.register_default(value_type, parser);
        self
    }

    pub fn named_parser(mut self, id: impl Into<String>, parser: impl ArgumentParser + 'static) -> Self {
        self.parsers.register_named(id, parser);
        self
    }

    pub fn validator(mut self, name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.validators.register(name, validator);
        self
    }

    /// Sets the default suggestion provider for `value_type`.
    pub fn provider(
        mut self,
        value_type: ValueType,
        provider: impl SuggestionProvider + 'static,
    ) -> Self {
        self.suggestions.register_default(value_type, provider);
        self
    }

    pub fn named_provider(
        mut self,
        id: impl Into<String>,
        provider: impl SuggestionProvider + 'static,
    ) -> Self {
        self.suggestions.register_named(id, provider);
        self
    }

    /// Registers an enumeration type: a case-insensitive parser and a provider
    /// suggesting its variants.
    pub fn choice_type<S: Into<String>>(
        mut self,
        value_type: ValueType,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        let variants: Vec<String> = variants.into_iter().map(Into::into).collect();
        self.parsers
            .register_choices(value_type.clone(), variants.iter().cloned());
        self.suggestions.register_choices(value_type, variants);
        self
    }

    pub fn permission_gate(mut self, gate: impl PermissionGate + 'static) -> Self {
        self.permissions = Arc::new(gate);
        self
    }

    pub fn cooldown_gate(self, gate: impl CooldownGate + 'static) -> Self {
        self.shared_cooldown_gate(Arc::new(gate))
    }

    /// Uses a gate the caller keeps a handle to.
    pub fn shared_cooldown_gate(mut self, gate: Arc<dyn CooldownGate>) -> Self {
        self.cooldowns = Some(gate);
        self
    }

    /// Routes errors of `kind` to `handler` instead of returning them.
    pub fn on_error<F>(mut self, kind: ErrorKind, handler: F) -> Self
    where
        F: Fn(&InvocationError, &dyn Sender) + Send + Sync + 'static,
    {
        self.error_handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Builds the tree and checks that every parameter's parser, suggestion
    /// provider and validators are registered.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        let tree = CommandTree::new(self.roots)?;

        for definition in tree.definitions() {
            for parameter in definition.parameters() {
                if parameter.is_sender() {
                    continue;
                }
                self.parsers.resolve(parameter)?;
                self.suggestions.resolve(parameter)?;
                for constraint in parameter.constraints() {
                    self.validators.check(constraint)?;
                }
            }
        }

        info!(
            commands = tree.len(),
            definitions = tree.definitions().len(),
            prefix = %self.config.prefix,
            "command dispatcher ready"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                tree,
                parsers: self.parsers,
                validators: self.validators,
                suggestions: self.suggestions,
                permissions: self.permissions,
                cooldowns: self.cooldowns,
                error_handlers: self.error_handlers,
                config: self.config,
            }),
        })
    }
}
