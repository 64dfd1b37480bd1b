//! The identity that issues commands.

use std::collections::HashSet;
use std::fmt;

use crate::value::ValueType;

/// Who issued a command.
///
/// The engine treats senders as opaque: it only asks for a stable id (cooldown
/// bookkeeping), the runtime type (sender-slot injection) and permission tags
/// (the metadata permission gate).
pub trait Sender: Send + Sync + fmt::Debug {
    /// Stable identity of the sender.
    fn id(&self) -> &str;

    /// Runtime type of the sender.
    fn value_type(&self) -> ValueType;

    /// Whether a parameter declared as `ty` can receive this sender.
    ///
    /// The default accepts the root [`ValueType::SENDER`] and the sender's own type.
    fn is_instance_of(&self, ty: &ValueType) -> bool {
        *ty == ValueType::SENDER || *ty == self.value_type()
    }

    /// Whether the sender holds `permission`.
    fn has_permission(&self, _permission: &str) -> bool {
        true
    }
}

/// General-purpose sender with a type chain and a permission set.
#[derive(Debug, Clone)]
pub struct BasicSender {
    id: String,
    value_type: ValueType,
    supertypes: Vec<ValueType>,
    permissions: HashSet<String>,
    operator: bool,
}

impl BasicSender {
    /// Creates a sender of the given runtime type with no permissions.
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            value_type,
            supertypes: Vec::new(),
            permissions: HashSet::new(),
            operator: false,
        }
    }

    /// Declares an additional type this sender is an instance of.
    pub fn with_supertype(mut self, ty: ValueType) -> Self {
        self.supertypes.push(ty);
        self
    }

    /// Grants a permission tag.
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// Grants every permission.
    pub fn operator(mut self) -> Self {
        self.operator = true;
        self
    }
}

impl Sender for BasicSender {
    fn id(&self) -> &str {
        &self.id
    }

    fn value_type(&self) -> ValueType {
        self.value_type.clone()
    }

    fn is_instance_of(&self, ty: &ValueType) -> bool {
        *ty == ValueType::SENDER || *ty == self.value_type || self.supertypes.contains(ty)
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.operator || self.permissions.contains(permission)
    }
}
