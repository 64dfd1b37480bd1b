//! Token-to-value converters and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::tree::ParameterSpec;
use crate::value::{Value, ValueType};

/// Converts one raw token into a typed value.
///
/// The error string becomes the message of an argument-parse failure.
pub trait ArgumentParser: Send + Sync {
    fn parse(&self, token: &str) -> Result<Value, String>;
}

impl<F> ArgumentParser for F
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync,
{
    fn parse(&self, token: &str) -> Result<Value, String> {
        self(token)
    }
}

// ============================================================
// BUILT-IN PARSERS
// ============================================================

/// Parses signed 64-bit integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerParser;

impl ArgumentParser for IntegerParser {
    fn parse(&self, token: &str) -> Result<Value, String> {
        token
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|e| format!("expected an integer ({e})"))
    }
}

/// Parses finite floats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatParser;

impl ArgumentParser for FloatParser {
    fn parse(&self, token: &str) -> Result<Value, String> {
        match token.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            Ok(_) => Err("expected a finite number".to_string()),
            Err(e) => Err(format!("expected a number ({e})")),
        }
    }
}

/// Parses `true/false`, `yes/no` and `on/off`, case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanParser;

impl ArgumentParser for BooleanParser {
    fn parse(&self, token: &str) -> Result<Value, String> {
        match token.to_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(Value::Boolean(true)),
            "false" | "no" | "off" => Ok(Value::Boolean(false)),
            _ => Err("expected true or false".to_string()),
        }
    }
}

/// Matches a token against a fixed set of variants, case-insensitively.
#[derive(Debug, Clone)]
pub struct ChoiceParser {
    variants: Vec<String>,
}

impl ChoiceParser {
    pub fn new(variants: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }
}

impl ArgumentParser for ChoiceParser {
    fn parse(&self, token: &str) -> Result<Value, String> {
        let folded = token.to_lowercase();
        self.variants
            .iter()
            .find(|variant| variant.to_lowercase() == folded)
            .map(|variant| Value::Choice(variant.clone()))
            .ok_or_else(|| format!("expected one of: {}", self.variants.join(", ")))
    }
}

// ============================================================
// REGISTRY
// ============================================================

/// Default parsers per value type plus explicitly named parsers.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    defaults: HashMap<ValueType, Arc<dyn ArgumentParser>>,
    named: HashMap<String, Arc<dyn ArgumentParser>>,
}

impl ParserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the integer, float and boolean defaults.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_default(ValueType::INTEGER, IntegerParser)
            .register_default(ValueType::FLOAT, FloatParser)
            .register_default(ValueType::BOOLEAN, BooleanParser);
        registry
    }

    /// Sets the default parser for `value_type`, replacing any previous one.
    pub fn register_default(
        &mut self,
        value_type: ValueType,
        parser: impl ArgumentParser + 'static,
    ) -> &mut Self {
        self.defaults.insert(value_type, Arc::new(parser));
        self
    }

    /// Registers a parser reachable through an explicit id.
    pub fn register_named(
        &mut self,
        id: impl Into<String>,
        parser: impl ArgumentParser + 'static,
    ) -> &mut Self {
        self.named.insert(id.into(), Arc::new(parser));
        self
    }

    /// Registers an enumeration type as the default parser for `value_type`.
    pub fn register_choices(
        &mut self,
        value_type: ValueType,
        variants: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.register_default(value_type, ChoiceParser::new(variants))
    }

    pub fn default_for(&self, value_type: &ValueType) -> Option<&Arc<dyn ArgumentParser>> {
        self.defaults.get(value_type)
    }

    pub fn named(&self, id: &str) -> Option<&Arc<dyn ArgumentParser>> {
        self.named.get(id)
    }

    /// Picks the converter for `parameter`.
    ///
    /// An explicit parser id wins; otherwise the default for the value type.
    /// Text without a registered default yields `Ok(None)` (the raw token is used).
    pub fn resolve(
        &self,
        parameter: &ParameterSpec,
    ) -> Result<Option<&Arc<dyn ArgumentParser>>, ConfigError> {
        if let Some(id) = parameter.parser_id() {
            return self
                .named(id)
                .map(Some)
                .ok_or_else(|| ConfigError::UnknownParser(id.to_string()));
        }
        match self.default_for(parameter.value_type()) {
            Some(parser) => Ok(Some(parser)),
            None if parameter.value_type().is_text() => Ok(None),
            None => Err(ConfigError::MissingDefaultParser(
                parameter.value_type().clone(),
            )),
        }
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut defaults: Vec<_> = self.defaults.keys().map(ValueType::as_str).collect();
        defaults.sort_unstable();
        let mut named: Vec<_> = self.named.keys().collect();
        named.sort_unstable();
        f.debug_struct("ParserRegistry")
            .field("defaults", &defaults)
            .field("named", &named)
            .finish()
    }
}
