//! Token-to-node resolution and arity filtering.
//!
//! Descent is greedy: once a child alias is consumed it is never given back,
//! even if a later step fails.

use std::sync::Arc;

use tracing::debug;

use crate::error::InvocationError;
use crate::tree::{CommandNode, CommandTree, SubcommandDefinition};

/// Matches the root alias, then descends through child aliases for as long as
/// they match.
pub fn resolve_command<'t, 'a, T: AsRef<str>>(
    tree: &'t CommandTree,
    tokens: &'a [T],
) -> Result<(&'t Arc<CommandNode>, &'a [T]), InvocationError> {
    let Some((first, mut rest)) = tokens.split_first() else {
        return Err(InvocationError::CommandNotFound {
            name: String::new(),
        });
    };

    let mut node = tree
        .get(first.as_ref())
        .ok_or_else(|| InvocationError::CommandNotFound {
            name: first.as_ref().to_string(),
        })?;

    while let Some((next, tail)) = rest.split_first() {
        match node.child(next.as_ref()) {
            Some(child) => {
                node = child;
                rest = tail;
            }
            None => break,
        }
    }

    debug!(command = node.path(), remaining = rest.len(), "resolved command");
    Ok((node, rest))
}

/// Selects the named group for the next token, or the default group without
/// consuming anything.
pub fn resolve_subcommand_group<'t, 'a, T: AsRef<str>>(
    node: &'t CommandNode,
    tokens: &'a [T],
) -> Result<(&'t [Arc<SubcommandDefinition>], &'a [T]), InvocationError> {
    let (group, rest) = match tokens.split_first() {
        Some((next, tail)) => match node.group(next.as_ref()) {
            Some(group) => (group.overloads(), tail),
            None => (node.defaults(), tokens),
        },
        None => (node.defaults(), tokens),
    };

    if group.is_empty() {
        return Err(InvocationError::SubcommandNotFound {
            command: node.path().to_string(),
        });
    }
    Ok((group, rest))
}

/// Keeps the definitions whose parameter list fits `count` tokens, in order.
pub fn filter_by_arity<'t>(
    node: &CommandNode,
    group: &'t [Arc<SubcommandDefinition>],
    count: usize,
) -> Result<Vec<&'t Arc<SubcommandDefinition>>, InvocationError> {
    let candidates: Vec<_> = group.iter().filter(|d| d.accepts(count)).collect();
    if candidates.is_empty() {
        return Err(InvocationError::IncorrectArgumentCount {
            command: node.path().to_string(),
            provided: count,
            rejected: group.iter().map(|d| d.signature()).collect(),
        });
    }
    Ok(candidates)
}
