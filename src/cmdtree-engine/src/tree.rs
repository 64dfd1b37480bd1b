//! Command tree: nodes, subcommand definitions and parameter specs.
//!
//! Trees are assembled with [`CommandNode::builder`] and
//! [`SubcommandDefinition::builder`], validated once by [`CommandTree::new`],
//! and never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::error::{ConfigError, HandlerError};
use crate::sender::Sender;
use crate::value::{Arguments, Value, ValueType};

// ============================================================
// HANDLERS AND GUARDS
// ============================================================

/// The invocable body of a subcommand definition.
pub trait CommandHandler: Send + Sync {
    fn call(&self, args: Arguments) -> Result<Option<Value>, HandlerError>;
}

impl<F> CommandHandler for F
where
    F: Fn(Arguments) -> Result<Option<Value>, HandlerError> + Send + Sync,
{
    fn call(&self, args: Arguments) -> Result<Option<Value>, HandlerError> {
        self(args)
    }
}

/// Guard run before a command is bound; `false` aborts the invocation.
pub type Precondition = Arc<dyn Fn(&dyn Sender, &CommandNode) -> bool + Send + Sync>;

/// Declared metadata attached at registration time.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Permission tag checked by [`crate::MetadataPermissionGate`].
    pub permission: Option<String>,
    /// Cooldown window between successful invocations.
    pub cooldown: Option<Duration>,
    pub description: Option<String>,
}

// ============================================================
// PARAMETERS
// ============================================================

/// A validator constraint attached to a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Validator id in the [`crate::ValidatorRegistry`].
    pub name: String,
    /// Constraint argument, interpreted by the validator.
    pub argument: Option<String>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, argument: Option<&str>) -> Self {
        Self {
            name: name.into(),
            argument: argument.map(str::to_string),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{}({})", self.name, argument),
            None => f.write_str(&self.name),
        }
    }
}

/// One declared parameter of a subcommand definition.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    name: String,
    value_type: ValueType,
    sender: bool,
    parser: Option<String>,
    constraints: Vec<Constraint>,
    suggestions: Option<String>,
    variadic: bool,
}

impl ParameterSpec {
    /// A positional parameter converted from one token.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            sender: false,
            parser: None,
            constraints: Vec::new(),
            suggestions: None,
            variadic: false,
        }
    }

    /// The injected sender slot; `value_type` is the sender type it accepts.
    pub fn sender(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            sender: true,
            ..Self::new(name, value_type)
        }
    }

    /// Use an explicitly registered parser instead of the type default.
    pub fn parser(mut self, id: impl Into<String>) -> Self {
        self.parser = Some(id.into());
        self
    }

    /// Attach a validator constraint.
    pub fn constraint(mut self, name: impl Into<String>, argument: Option<&str>) -> Self {
        self.constraints.push(Constraint::new(name, argument));
        self
    }

    /// Use an explicitly registered suggestion provider.
    pub fn suggestions(mut self, id: impl Into<String>) -> Self {
        self.suggestions = Some(id.into());
        self
    }

    /// Consume every remaining token as a sequence of this type.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_sender(&self) -> bool {
        self.sender
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn parser_id(&self) -> Option<&str> {
        self.parser.as_deref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn suggestion_id(&self) -> Option<&str> {
        self.suggestions.as_deref()
    }

    fn usage(&self) -> String {
        if self.variadic {
            format!("<{}:{}...>", self.name, self.value_type)
        } else {
            format!("<{}:{}>", self.name, self.value_type)
        }
    }
}

// ============================================================
// SUBCOMMAND DEFINITIONS
// ============================================================

/// One overload: parameter list, handler and metadata.
pub struct SubcommandDefinition {
    aliases: Vec<String>,
    parameters: Vec<ParameterSpec>,
    handler: Arc<dyn CommandHandler>,
    metadata: Metadata,
    path: String,
}

impl SubcommandDefinition {
    /// Starts a default (unnamed) overload.
    pub fn builder() -> SubcommandBuilder {
        SubcommandBuilder::default()
    }

    /// Starts a named overload reachable through `alias`.
    pub fn named(alias: impl Into<String>) -> SubcommandBuilder {
        SubcommandBuilder::default().alias(alias)
    }

    /// Aliases; empty for default overloads.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Primary alias, or `None` for default overloads.
    pub fn name(&self) -> Option<&str> {
        self.aliases.first().map(String::as_str)
    }

    /// Full path, e.g. `math add`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Position of the sender slot, if declared.
    pub fn sender_index(&self) -> Option<usize> {
        self.parameters.iter().position(ParameterSpec::is_sender)
    }

    /// Whether the last parameter is variadic.
    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(ParameterSpec::is_variadic)
    }

    /// Parameters filled from tokens, in order (the sender slot excluded).
    pub fn value_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| !p.is_sender())
    }

    /// Number of tokens that must be present.
    ///
    /// The sender slot never consumes a token and a variadic slot may be empty.
    pub fn required_count(&self) -> usize {
        let values = self.value_parameters().count();
        if self.is_variadic() { values - 1 } else { values }
    }

    /// Whether `count` tokens fit this parameter list.
    pub fn accepts(&self, count: usize) -> bool {
        if self.is_variadic() {
            count >= self.required_count()
        } else {
            count == self.required_count()
        }
    }

    /// The parameter a token at value position `index` would bind to.
    pub fn parameter_at(&self, index: usize) -> Option<&ParameterSpec> {
        let count = self.value_parameters().count();
        if index < count {
            self.value_parameters().nth(index)
        } else if self.is_variadic() {
            self.parameters.last()
        } else {
            None
        }
    }

    /// Human-readable signature, e.g. `math add <a:integer> <b:integer>`.
    pub fn signature(&self) -> String {
        let mut signature = self.path.clone();
        for parameter in self.value_parameters() {
            signature.push(' ');
            signature.push_str(&parameter.usage());
        }
        signature
    }
}

impl fmt::Debug for SubcommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubcommandDefinition")
            .field("path", &self.path)
            .field("aliases", &self.aliases)
            .field("parameters", &self.parameters)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SubcommandDefinition`].
pub struct SubcommandBuilder {
    aliases: Vec<String>,
    parameters: Vec<ParameterSpec>,
    handler: Arc<dyn CommandHandler>,
    metadata: Metadata,
}

impl Default for SubcommandBuilder {
    fn default() -> Self {
        Self {
            aliases: Vec::new(),
            parameters: Vec::new(),
            handler: Arc::new(|_: Arguments| -> Result<Option<Value>, HandlerError> { Ok(None) }),
            metadata: Metadata::default(),
        }
    }
}

impl SubcommandBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn param(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Shorthand for a sender slot at the current position.
    pub fn sender(self, value_type: ValueType) -> Self {
        self.param(ParameterSpec::sender("sender", value_type))
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.metadata.permission = Some(permission.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Result<Option<Value>, HandlerError> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Use an existing handler object.
    pub fn handler_arc(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = handler;
        self
    }

    fn build(self, parent: &str) -> Result<SubcommandDefinition, ConfigError> {
        for alias in &self.aliases {
            validate_alias(alias)?;
        }

        let path = match self.aliases.first() {
            Some(alias) => format!("{parent} {alias}"),
            None => parent.to_string(),
        };

        let last = self.parameters.len().saturating_sub(1);
        let mut senders = 0;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if parameter.is_sender() {
                senders += 1;
                if parameter.is_variadic() {
                    return Err(ConfigError::VariadicSender {
                        definition: path,
                        parameter: parameter.name.clone(),
                    });
                }
            }
            if parameter.is_variadic() && index != last {
                return Err(ConfigError::VariadicNotLast {
                    definition: path,
                    parameter: parameter.name.clone(),
                });
            }
        }
        if senders > 1 {
            return Err(ConfigError::MultipleSenders { definition: path });
        }

        Ok(SubcommandDefinition {
            aliases: self.aliases,
            parameters: self.parameters,
            handler: self.handler,
            metadata: self.metadata,
            path,
        })
    }
}

// ============================================================
// COMMAND NODES
// ============================================================

/// Overloads sharing one alias.
#[derive(Debug, Clone)]
pub struct SubcommandGroup {
    alias: String,
    overloads: Vec<Arc<SubcommandDefinition>>,
}

impl SubcommandGroup {
    /// The alias as declared.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Overloads in registration order.
    pub fn overloads(&self) -> &[Arc<SubcommandDefinition>] {
        &self.overloads
    }
}

/// A named entry point in the command tree.
pub struct CommandNode {
    aliases: Vec<String>,
    path: String,
    children: Vec<Arc<CommandNode>>,
    child_index: HashMap<String, usize>,
    groups: IndexMap<String, SubcommandGroup>,
    defaults: Vec<Arc<SubcommandDefinition>>,
    metadata: Metadata,
    preconditions: Vec<Precondition>,
}

impl CommandNode {
    /// Starts a node whose primary name is `name`.
    pub fn builder(name: impl Into<String>) -> CommandNodeBuilder {
        CommandNodeBuilder {
            aliases: vec![name.into()],
            children: Vec::new(),
            subcommands: Vec::new(),
            defaults: Vec::new(),
            metadata: Metadata::default(),
            preconditions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.aliases[0]
    }

    /// Primary name followed by the other aliases.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Full path from the root, e.g. `test sub`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child node reachable through `alias` (case-insensitive).
    pub fn child(&self, alias: &str) -> Option<&Arc<CommandNode>> {
        self.child_index
            .get(&alias.to_lowercase())
            .map(|&index| &self.children[index])
    }

    pub fn children(&self) -> &[Arc<CommandNode>] {
        &self.children
    }

    /// Named group reachable through `alias` (case-insensitive).
    pub fn group(&self, alias: &str) -> Option<&SubcommandGroup> {
        self.groups.get(&alias.to_lowercase())
    }

    /// Named groups in registration order, one per alias.
    pub fn groups(&self) -> impl Iterator<Item = &SubcommandGroup> {
        self.groups.values()
    }

    /// Overloads invoked when no subcommand alias is given.
    pub fn defaults(&self) -> &[Arc<SubcommandDefinition>] {
        &self.defaults
    }

    pub fn has_defaults(&self) -> bool {
        !self.defaults.is_empty()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn preconditions(&self) -> &[Precondition] {
        &self.preconditions
    }

    /// Every definition below this node, this node's first.
    pub fn definitions(&self) -> Vec<&Arc<SubcommandDefinition>> {
        let mut definitions: Vec<_> = self.defaults.iter().collect();
        for group in self.groups.values() {
            for overload in &group.overloads {
                if !definitions.iter().any(|d| Arc::ptr_eq(d, overload)) {
                    definitions.push(overload);
                }
            }
        }
        for child in &self.children {
            definitions.extend(child.definitions());
        }
        definitions
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandNode")
            .field("path", &self.path)
            .field("aliases", &self.aliases)
            .field("children", &self.children)
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("defaults", &self.defaults.len())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CommandNode`].
pub struct CommandNodeBuilder {
    aliases: Vec<String>,
    children: Vec<CommandNodeBuilder>,
    subcommands: Vec<SubcommandBuilder>,
    defaults: Vec<SubcommandBuilder>,
    metadata: Metadata,
    preconditions: Vec<Precondition>,
}

impl CommandNodeBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.metadata.permission = Some(permission.into());
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.metadata.cooldown = Some(cooldown);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    /// Adds a precondition; all must pass, checked in order.
    pub fn before<F>(mut self, guard: F) -> Self
    where
        F: Fn(&dyn Sender, &CommandNode) -> bool + Send + Sync + 'static,
    {
        self.preconditions.push(Arc::new(guard));
        self
    }

    /// Adds a child command node.
    pub fn child(mut self, child: CommandNodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Adds a named overload; it joins the group of each of its aliases.
    pub fn subcommand(mut self, subcommand: SubcommandBuilder) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Adds an overload to the default group.
    pub fn default_overload(mut self, subcommand: SubcommandBuilder) -> Self {
        self.defaults.push(subcommand);
        self
    }

    fn build(self, parent: Option<&str>) -> Result<CommandNode, ConfigError> {
        for alias in &self.aliases {
            validate_alias(alias)?;
        }
        let name = &self.aliases[0];
        let path = match parent {
            Some(parent) => format!("{parent} {name}"),
            None => name.clone(),
        };

        let mut children = Vec::with_capacity(self.children.len());
        let mut child_index = HashMap::new();
        for child in self.children {
            let child = child.build(Some(&path))?;
            let position = children.len();
            for alias in &child.aliases {
                if child_index.insert(alias.to_lowercase(), position).is_some() {
                    return Err(ConfigError::DuplicateAlias {
                        scope: format!("children of '{path}'"),
                        alias: alias.clone(),
                    });
                }
            }
            children.push(Arc::new(child));
        }

        let mut groups: IndexMap<String, SubcommandGroup> = IndexMap::new();
        for subcommand in self.subcommands {
            if subcommand.aliases.is_empty() {
                return Err(ConfigError::MissingAlias { command: path });
            }
            let definition = Arc::new(subcommand.build(&path)?);
            for alias in definition.aliases() {
                let group = groups
                    .entry(alias.to_lowercase())
                    .or_insert_with(|| SubcommandGroup {
                        alias: alias.clone(),
                        overloads: Vec::new(),
                    });
                group.overloads.push(Arc::clone(&definition));
            }
        }

        let mut defaults = Vec::with_capacity(self.defaults.len());
        for subcommand in self.defaults {
            if !subcommand.aliases.is_empty() {
                return Err(ConfigError::AliasedDefault { command: path });
            }
            defaults.push(Arc::new(subcommand.build(&path)?));
        }

        Ok(CommandNode {
            aliases: self.aliases,
            path,
            children,
            child_index,
            groups,
            defaults,
            metadata: self.metadata,
            preconditions: self.preconditions,
        })
    }
}

fn validate_alias(alias: &str) -> Result<(), ConfigError> {
    if alias.is_empty() || alias.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidAlias(alias.to_string()));
    }
    Ok(())
}

// ============================================================
// COMMAND TREE
// ============================================================

/// The set of root commands, indexed by every alias.
#[derive(Debug, Default)]
pub struct CommandTree {
    roots: Vec<Arc<CommandNode>>,
    index: HashMap<String, usize>,
}

impl CommandTree {
    /// Builds and validates a tree from root node builders.
    pub fn new(roots: impl IntoIterator<Item = CommandNodeBuilder>) -> Result<Self, ConfigError> {
        let mut tree = Self::default();
        for root in roots {
            let node = root.build(None)?;
            let position = tree.roots.len();
            for alias in &node.aliases {
                if tree.index.insert(alias.to_lowercase(), position).is_some() {
                    return Err(ConfigError::DuplicateAlias {
                        scope: "root commands".to_string(),
                        alias: alias.clone(),
                    });
                }
            }
            tree.roots.push(Arc::new(node));
        }
        Ok(tree)
    }

    /// Root command reachable through `alias` (case-insensitive).
    pub fn get(&self, alias: &str) -> Option<&Arc<CommandNode>> {
        self.index
            .get(&alias.to_lowercase())
            .map(|&index| &self.roots[index])
    }

    /// Root commands in registration order.
    pub fn roots(&self) -> &[Arc<CommandNode>] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Every definition in the tree.
    pub fn definitions(&self) -> Vec<&Arc<SubcommandDefinition>> {
        self.roots.iter().flat_map(|root| root.definitions()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str) -> ParameterSpec {
        ParameterSpec::new(name, ValueType::TEXT)
    }

    #[test]
    fn test_build_indexes_aliases_case_insensitively() {
        let tree = CommandTree::new([CommandNode::builder("Test")
            .alias("t")
            .child(CommandNode::builder("sub").alias("s"))
            .subcommand(SubcommandDefinition::named("aaa").alias("A"))])
        .unwrap();

        let root = tree.get("TEST").unwrap();
        assert_eq!(root.name(), "Test");
        assert!(tree.get("t").is_some());
        assert_eq!(root.child("S").unwrap().path(), "Test sub");
        assert_eq!(root.group("a").unwrap().alias(), "A");
        assert_eq!(root.group("AAA").unwrap().overloads()[0].path(), "Test aaa");
    }

    #[test]
    fn test_duplicate_child_alias_rejected() {
        let result = CommandTree::new([CommandNode::builder("root")
            .child(CommandNode::builder("one").alias("x"))
            .child(CommandNode::builder("two").alias("X"))]);

        assert!(matches!(result, Err(ConfigError::DuplicateAlias { .. })));
    }

    #[test]
    fn test_alias_shared_across_scopes_is_allowed() {
        let tree = CommandTree::new([CommandNode::builder("root")
            .child(CommandNode::builder("list"))
            .subcommand(SubcommandDefinition::named("list"))]);

        assert!(tree.is_ok());
    }

    #[test]
    fn test_overloads_share_group() {
        let tree = CommandTree::new([CommandNode::builder("cmd")
            .subcommand(SubcommandDefinition::named("go").param(text("a")))
            .subcommand(SubcommandDefinition::named("go").param(text("a")).param(text("b")))])
        .unwrap();

        let group = tree.get("cmd").unwrap().group("go").unwrap();
        assert_eq!(group.overloads().len(), 2);
    }

    #[test]
    fn test_variadic_must_be_last() {
        let result = CommandTree::new([CommandNode::builder("cmd").default_overload(
            SubcommandDefinition::builder()
                .param(text("rest").variadic())
                .param(text("tail")),
        )]);

        assert!(matches!(result, Err(ConfigError::VariadicNotLast { .. })));
    }

    #[test]
    fn test_single_sender_slot() {
        let result = CommandTree::new([CommandNode::builder("cmd").default_overload(
            SubcommandDefinition::builder()
                .sender(ValueType::SENDER)
                .sender(ValueType::SENDER),
        )]);

        assert!(matches!(result, Err(ConfigError::MultipleSenders { .. })));
    }

    #[test]
    fn test_named_subcommand_needs_alias() {
        let result = CommandTree::new([
            CommandNode::builder("cmd").subcommand(SubcommandDefinition::builder())
        ]);
        assert!(matches!(result, Err(ConfigError::MissingAlias { .. })));

        let result = CommandTree::new([
            CommandNode::builder("cmd").default_overload(SubcommandDefinition::named("x"))
        ]);
        assert!(matches!(result, Err(ConfigError::AliasedDefault { .. })));
    }

    #[test]
    fn test_whitespace_alias_rejected() {
        let result = CommandTree::new([CommandNode::builder("two words")]);
        assert!(matches!(result, Err(ConfigError::InvalidAlias(_))));
    }

    #[test]
    fn test_required_count_and_accepts() {
        let tree = CommandTree::new([CommandNode::builder("cmd")
            .default_overload(
                SubcommandDefinition::builder()
                    .sender(ValueType::SENDER)
                    .param(text("a"))
                    .param(text("b")),
            )
            .subcommand(
                SubcommandDefinition::named("many")
                    .param(text("first"))
                    .param(text("rest").variadic()),
            )])
        .unwrap();
        let node = tree.get("cmd").unwrap();

        let fixed = &node.defaults()[0];
        assert_eq!(fixed.required_count(), 2);
        assert!(fixed.accepts(2));
        assert!(!fixed.accepts(1));
        assert!(!fixed.accepts(3));

        let many = &node.group("many").unwrap().overloads()[0];
        assert_eq!(many.required_count(), 1);
        assert!(!many.accepts(0));
        assert!(many.accepts(1));
        assert!(many.accepts(5));
        assert_eq!(many.parameter_at(4).unwrap().name(), "rest");
        assert_eq!(many.signature(), "cmd many <first:text> <rest:text...>");
    }

    #[test]
    fn test_definitions_walks_tree() {
        let tree = CommandTree::new([CommandNode::builder("a")
            .default_overload(SubcommandDefinition::builder())
            .subcommand(SubcommandDefinition::named("x").alias("y"))
            .child(CommandNode::builder("b").subcommand(SubcommandDefinition::named("z")))])
        .unwrap();

        assert_eq!(tree.definitions().len(), 3);
    }
}
