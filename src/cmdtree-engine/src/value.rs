//! Typed argument values and the value-type identifiers that key the registries.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, anyhow};

use crate::sender::Sender;

// ============================================================
// VALUE TYPE
// ============================================================

/// Identifier of a parameter value type.
///
/// Parsers and suggestion providers are registered per value type, and sender
/// parameters declare the sender type they accept through one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueType(Cow<'static, str>);

impl ValueType {
    /// Plain text. Has no conversion step unless a default text parser is registered.
    pub const TEXT: ValueType = ValueType::from_static("text");
    /// Signed 64-bit integer.
    pub const INTEGER: ValueType = ValueType::from_static("integer");
    /// 64-bit float.
    pub const FLOAT: ValueType = ValueType::from_static("float");
    /// Boolean.
    pub const BOOLEAN: ValueType = ValueType::from_static("boolean");
    /// Root of every sender type; any sender satisfies it.
    pub const SENDER: ValueType = ValueType::from_static("sender");

    /// Creates a value type from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a value type from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the plain text type.
    pub fn is_text(&self) -> bool {
        *self == Self::TEXT
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ValueType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

// ============================================================
// VALUE
// ============================================================

/// A converted argument.
#[derive(Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Canonical spelling of an enumeration variant.
    Choice(String),
    /// Elements bound to a variadic parameter.
    List(Vec<Value>),
    /// The invoking sender, injected at a declared sender slot.
    Sender(Arc<dyn Sender>),
    /// Output of a user-registered parser.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wraps an arbitrary value produced by a custom parser.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    /// Text or choice contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric contents, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_sender(&self) -> Option<&Arc<dyn Sender>> {
        match self {
            Value::Sender(sender) => Some(sender),
            _ => None,
        }
    }

    /// Downcasts a custom value.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Choice(_) => "choice",
            Value::List(_) => "list",
            Value::Sender(_) => "sender",
            Value::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Choice(s) => f.debug_tuple("Choice").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Sender(sender) => f.debug_tuple("Sender").field(&sender.id()).finish(),
            Value::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// User-facing rendering; lists are space-separated.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) | Value::Choice(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Sender(sender) => f.write_str(sender.id()),
            Value::Custom(_) => f.write_str("<custom>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) | (Value::Choice(a), Value::Choice(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Sender(a), Value::Sender(b)) => Arc::ptr_eq(a, b),
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

// ============================================================
// ARGUMENTS
// ============================================================

/// The bound argument vector handed to a handler, in declared parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    fn require(&self, index: usize) -> anyhow::Result<&Value> {
        self.values
            .get(index)
            .with_context(|| format!("no argument at position {index}"))
    }

    /// Text (or choice) argument at `index`.
    pub fn text(&self, index: usize) -> anyhow::Result<&str> {
        let value = self.require(index)?;
        value
            .as_str()
            .ok_or_else(|| anyhow!("argument {index} is {}, not text", value.kind_name()))
    }

    /// Integer argument at `index`.
    pub fn integer(&self, index: usize) -> anyhow::Result<i64> {
        let value = self.require(index)?;
        value
            .as_integer()
            .ok_or_else(|| anyhow!("argument {index} is {}, not integer", value.kind_name()))
    }

    /// Numeric argument at `index`.
    pub fn float(&self, index: usize) -> anyhow::Result<f64> {
        let value = self.require(index)?;
        value
            .as_float()
            .ok_or_else(|| anyhow!("argument {index} is {}, not a number", value.kind_name()))
    }

    /// Boolean argument at `index`.
    pub fn boolean(&self, index: usize) -> anyhow::Result<bool> {
        let value = self.require(index)?;
        value
            .as_bool()
            .ok_or_else(|| anyhow!("argument {index} is {}, not boolean", value.kind_name()))
    }

    /// Variadic elements at `index`.
    pub fn list(&self, index: usize) -> anyhow::Result<&[Value]> {
        let value = self.require(index)?;
        value
            .as_list()
            .ok_or_else(|| anyhow!("argument {index} is {}, not a list", value.kind_name()))
    }

    /// Injected sender at `index`.
    pub fn sender(&self, index: usize) -> anyhow::Result<&Arc<dyn Sender>> {
        let value = self.require(index)?;
        value
            .as_sender()
            .ok_or_else(|| anyhow!("argument {index} is {}, not the sender", value.kind_name()))
    }
}

impl IntoIterator for Arguments {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
