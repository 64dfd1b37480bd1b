//! Completion candidates for partially typed input.
//!
//! Suggestion walks the tree with the same rules as invocation, stops at the
//! pending (last) token and merges two sources: literal aliases of subcommand
//! groups and child nodes, and value suggestions for the parameter under the
//! cursor. Permission vetoes filter silently here.

use indexmap::IndexSet;
use tracing::debug;

use crate::error::InvocationError;
use crate::gate::{PermissionGate, PermissionTarget};
use crate::provider::SuggestionRegistry;
use crate::sender::Sender;
use crate::tokenizer::TokenizedInput;
use crate::tree::{CommandNode, CommandTree, SubcommandDefinition, SubcommandGroup};

/// Case-insensitive prefix match that excludes the pending token itself.
///
/// An empty pending token matches everything.
pub fn matches_pending(candidate: &str, pending: &str) -> bool {
    if pending.is_empty() {
        return true;
    }
    let candidate = candidate.to_lowercase();
    let pending = pending.to_lowercase();
    candidate.starts_with(&pending) && candidate != pending
}

/// Computes completions over a borrowed tree and registries.
#[derive(Clone, Copy)]
pub struct SuggestionEngine<'a> {
    tree: &'a CommandTree,
    providers: &'a SuggestionRegistry,
    permissions: &'a dyn PermissionGate,
    prefix: &'a str,
    limit: Option<usize>,
}

impl<'a> SuggestionEngine<'a> {
    pub fn new(
        tree: &'a CommandTree,
        providers: &'a SuggestionRegistry,
        permissions: &'a dyn PermissionGate,
        prefix: &'a str,
    ) -> Self {
        Self {
            tree,
            providers,
            permissions,
            prefix,
            limit: None,
        }
    }

    /// Caps the number of returned suggestions.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Returns the deduplicated completions for `input`.
    ///
    /// Fails only when `input` lacks the prefix.
    pub fn suggest(&self, sender: &dyn Sender, input: &str) -> Result<Vec<String>, InvocationError> {
        let tokenized = TokenizedInput::parse(input, self.prefix)?;
        let tokens = tokenized.completion_tokens();

        let mut out = IndexSet::new();
        self.collect(sender, &tokens, &mut out);

        let mut suggestions: Vec<String> = out.into_iter().collect();
        if let Some(limit) = self.limit {
            suggestions.truncate(limit);
        }
        debug!(input, count = suggestions.len(), "computed suggestions");
        Ok(suggestions)
    }

    fn collect(&self, sender: &dyn Sender, tokens: &[&str], out: &mut IndexSet<String>) {
        let (first, rest) = match tokens.split_first() {
            None => return self.root_aliases(sender, "", out),
            Some((first, [])) => return self.root_aliases(sender, first, out),
            Some((first, rest)) => (*first, rest),
        };

        let Some(root) = self.tree.get(first) else {
            return self.root_aliases(sender, first, out);
        };
        if !self.permits_node(sender, root) {
            return;
        }

        let Some((pending, walked)) = rest.split_last() else {
            return;
        };

        let mut node: &CommandNode = root;
        let mut chosen: Option<&SubcommandGroup> = None;
        let mut consumed = 0;
        for token in walked {
            if let Some(child) = node.child(token).filter(|c| self.permits_node(sender, c)) {
                node = &**child;
                consumed += 1;
                continue;
            }
            if let Some(group) = node.group(token) {
                chosen = Some(group);
                consumed += 1;
                break;
            }
            if node.has_defaults() {
                break;
            }
            return;
        }

        if chosen.is_some() && pending.is_empty() {
            return;
        }

        let index = walked.len() - consumed;
        let overloads = chosen.map_or(node.defaults(), SubcommandGroup::overloads);
        for definition in overloads {
            if self.permits_definition(sender, definition) {
                self.parameter_values(sender, definition, index, pending, out);
            }
        }

        if index == 0 && chosen.is_none() {
            self.literal_aliases(sender, node, pending, out);
        }
    }

    fn root_aliases(&self, sender: &dyn Sender, pending: &str, out: &mut IndexSet<String>) {
        for root in self.tree.roots() {
            if !self.permits_node(sender, root) {
                continue;
            }
            for alias in root.aliases() {
                if matches_pending(alias, pending) {
                    out.insert(alias.clone());
                }
            }
        }
    }

    fn parameter_values(
        &self,
        sender: &dyn Sender,
        definition: &SubcommandDefinition,
        index: usize,
        pending: &str,
        out: &mut IndexSet<String>,
    ) {
        let Some(parameter) = definition.parameter_at(index) else {
            return;
        };
        let Some(provider) = self.providers.provider_for(parameter) else {
            return;
        };
        for candidate in provider.suggest(sender, pending, parameter) {
            if matches_pending(&candidate, pending) {
                out.insert(candidate);
            }
        }
    }

    fn literal_aliases(
        &self,
        sender: &dyn Sender,
        node: &CommandNode,
        pending: &str,
        out: &mut IndexSet<String>,
    ) {
        for group in node.groups() {
            if matches_pending(group.alias(), pending)
                && group
                    .overloads()
                    .iter()
                    .any(|d| self.permits_definition(sender, d))
            {
                out.insert(group.alias().to_string());
            }
        }
        for child in node.children() {
            if !self.permits_node(sender, child) {
                continue;
            }
            for alias in child.aliases() {
                if matches_pending(alias, pending) {
                    out.insert(alias.clone());
                }
            }
        }
    }

    fn permits_node(&self, sender: &dyn Sender, node: &CommandNode) -> bool {
        self.permissions
            .permits(sender, PermissionTarget::Command(node))
    }

    fn permits_definition(&self, sender: &dyn Sender, definition: &SubcommandDefinition) -> bool {
        self.permissions
            .permits(sender, PermissionTarget::Subcommand(definition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AllowAll;
    use crate::sender::BasicSender;
    use crate::tree::{ParameterSpec, SubcommandDefinition};
    use crate::value::ValueType;

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn test_matches_pending() {
        assert!(matches_pending("Apple", ""));
        assert!(matches_pending("Apple", "a"));
        assert!(matches_pending("apple", "AP"));
        assert!(!matches_pending("apple", "APPLE"));
        assert!(!matches_pending("apple", "b"));
    }

    #[test]
    fn test_named_group_parameters() {
        let tree = CommandTree::new([CommandNode::builder("toggle").subcommand(
            SubcommandDefinition::named("set")
                .param(ParameterSpec::new("flag", ValueType::BOOLEAN)),
        )])
        .unwrap();
        let providers = SuggestionRegistry::with_builtins();
        let engine = SuggestionEngine::new(&tree, &providers, &AllowAll, "/");
        let sender = BasicSender::new("s", ValueType::SENDER);

        assert!(engine.suggest(&sender, "/toggle set ").unwrap().is_empty());
        assert_eq!(engine.suggest(&sender, "/toggle set t").unwrap(), vec!["true"]);
        assert_eq!(engine.suggest(&sender, "/toggle s").unwrap(), vec!["set"]);
    }

    #[test]
    fn test_variadic_position_keeps_suggesting() {
        let tree = CommandTree::new([CommandNode::builder("flags").default_overload(
            SubcommandDefinition::builder()
                .param(ParameterSpec::new("values", ValueType::BOOLEAN).variadic()),
        )])
        .unwrap();
        let providers = SuggestionRegistry::with_builtins();
        let engine = SuggestionEngine::new(&tree, &providers, &AllowAll, "/");
        let sender = BasicSender::new("s", ValueType::SENDER);

        assert_eq!(
            sorted(engine.suggest(&sender, "/flags true false ").unwrap()),
            vec!["false", "true"]
        );
    }

    #[test]
    fn test_unknown_token_without_defaults_is_empty() {
        let tree = CommandTree::new([CommandNode::builder("a")
            .subcommand(SubcommandDefinition::named("b"))])
        .unwrap();
        let providers = SuggestionRegistry::new();
        let engine = SuggestionEngine::new(&tree, &providers, &AllowAll, "/");
        let sender = BasicSender::new("s", ValueType::SENDER);

        assert!(engine.suggest(&sender, "/a zzz ").unwrap().is_empty());
    }

    #[test]
    fn test_limit() {
        let tree = CommandTree::new(["a1", "a2", "a3"].map(CommandNode::builder)).unwrap();
        let providers = SuggestionRegistry::new();
        let engine = SuggestionEngine::new(&tree, &providers, &AllowAll, "/").with_limit(Some(2));
        let sender = BasicSender::new("s", ValueType::SENDER);

        assert_eq!(engine.suggest(&sender, "/a").unwrap().len(), 2);
    }
}
