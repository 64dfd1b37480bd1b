//! Permission and cooldown gates consulted by the dispatcher.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::trace;

use crate::error::InvocationError;
use crate::sender::Sender;
use crate::tree::{CommandNode, Metadata, SubcommandDefinition};

// ============================================================
// PERMISSIONS
// ============================================================

/// What a permission check is about.
#[derive(Debug, Clone, Copy)]
pub enum PermissionTarget<'a> {
    Command(&'a CommandNode),
    Subcommand(&'a SubcommandDefinition),
}

impl<'a> PermissionTarget<'a> {
    pub fn metadata(&self) -> &'a Metadata {
        match self {
            PermissionTarget::Command(node) => node.metadata(),
            PermissionTarget::Subcommand(definition) => definition.metadata(),
        }
    }

    /// Full path of the target, e.g. `message urgent`.
    pub fn path(&self) -> &'a str {
        match self {
            PermissionTarget::Command(node) => node.path(),
            PermissionTarget::Subcommand(definition) => definition.path(),
        }
    }

    /// Declared aliases; empty for default overloads.
    pub fn aliases(&self) -> &'a [String] {
        match self {
            PermissionTarget::Command(node) => node.aliases(),
            PermissionTarget::Subcommand(definition) => definition.aliases(),
        }
    }
}

/// Decides whether a sender may use a command or subcommand.
///
/// Invocation surfaces a veto as an error; suggestion treats it as a silent filter,
/// so implementations must not have side effects.
pub trait PermissionGate: Send + Sync {
    fn check(&self, sender: &dyn Sender, target: PermissionTarget<'_>) -> Result<(), InvocationError>;

    /// Boolean form used by the suggestion engine.
    fn permits(&self, sender: &dyn Sender, target: PermissionTarget<'_>) -> bool {
        self.check(sender, target).is_ok()
    }
}

impl<F> PermissionGate for F
where
    F: Fn(&dyn Sender, PermissionTarget<'_>) -> Result<(), InvocationError> + Send + Sync,
{
    fn check(&self, sender: &dyn Sender, target: PermissionTarget<'_>) -> Result<(), InvocationError> {
        self(sender, target)
    }
}

/// Permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn check(&self, _: &dyn Sender, _: PermissionTarget<'_>) -> Result<(), InvocationError> {
        Ok(())
    }
}

/// Checks the declared permission tag against [`Sender::has_permission`].
///
/// Targets without a tag are open to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataPermissionGate;

impl PermissionGate for MetadataPermissionGate {
    fn check(&self, sender: &dyn Sender, target: PermissionTarget<'_>) -> Result<(), InvocationError> {
        match target.metadata().permission.as_deref() {
            Some(permission) if !sender.has_permission(permission) => {
                trace!(sender = sender.id(), permission, target = target.path(), "permission denied");
                Err(InvocationError::not_enough_permission(target.path()))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================
// COOLDOWNS
// ============================================================

/// Tracks per-sender cooldown windows.
///
/// The dispatcher asks for the remaining wait before binding and calls
/// [`record`](Self::record) after the handler succeeds; the gate owns the
/// bookkeeping.
pub trait CooldownGate: Send + Sync {
    /// Time left before `sender` may run `command` again; zero when free.
    fn remaining(&self, sender: &dyn Sender, command: &CommandNode) -> Duration;

    /// Called after a successful invocation of `command`.
    fn record(&self, _sender: &dyn Sender, _command: &CommandNode) {}
}

/// In-process cooldown store keyed by sender id and command path.
#[derive(Debug, Default)]
pub struct InMemoryCooldowns {
    started: DashMap<(String, String), Instant>,
}

impl InMemoryCooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every window of `sender`.
    pub fn clear_sender(&self, sender: &str) {
        self.started.retain(|(id, _), _| id != sender);
    }

    /// Number of recorded windows, including expired ones.
    pub fn len(&self) -> usize {
        self.started.len()
    }

    pub fn is_empty(&self) -> bool {
        self.started.is_empty()
    }

    fn key(sender: &dyn Sender, command: &CommandNode) -> (String, String) {
        (sender.id().to_string(), command.path().to_string())
    }
}

impl CooldownGate for InMemoryCooldowns {
    fn remaining(&self, sender: &dyn Sender, command: &CommandNode) -> Duration {
        let Some(window) = command.metadata().cooldown else {
            return Duration::ZERO;
        };
        match self.started.get(&Self::key(sender, command)) {
            Some(started) => window.saturating_sub(started.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn record(&self, sender: &dyn Sender, command: &CommandNode) {
        if command.metadata().cooldown.is_some() {
            self.started.insert(Self::key(sender, command), Instant::now());
        }
    }
}
