//! Value-level suggestion providers and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::sender::Sender;
use crate::tree::ParameterSpec;
use crate::value::ValueType;

/// Produces completion candidates for one parameter.
///
/// Providers may return every candidate; the suggestion engine applies the
/// prefix filter against the pending token itself.
pub trait SuggestionProvider: Send + Sync {
    fn suggest(&self, sender: &dyn Sender, partial: &str, parameter: &ParameterSpec)
    -> Vec<String>;
}

impl<F> SuggestionProvider for F
where
    F: Fn(&dyn Sender, &str, &ParameterSpec) -> Vec<String> + Send + Sync,
{
    fn suggest(
        &self,
        sender: &dyn Sender,
        partial: &str,
        parameter: &ParameterSpec,
    ) -> Vec<String> {
        self(sender, partial, parameter)
    }
}

/// A fixed candidate list.
#[derive(Debug, Clone)]
pub struct StaticSuggestions {
    values: Vec<String>,
}

impl StaticSuggestions {
    pub fn new(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl SuggestionProvider for StaticSuggestions {
    fn suggest(&self, _: &dyn Sender, _: &str, _: &ParameterSpec) -> Vec<String> {
        self.values.clone()
    }
}

/// Default providers per value type plus explicitly named providers.
#[derive(Clone, Default)]
pub struct SuggestionRegistry {
    defaults: HashMap<ValueType, Arc<dyn SuggestionProvider>>,
    named: HashMap<String, Arc<dyn SuggestionProvider>>,
}

impl SuggestionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that suggests `true`/`false` for booleans.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_default(ValueType::BOOLEAN, StaticSuggestions::new(["true", "false"]));
        registry
    }

    pub fn register_default(
        &mut self,
        value_type: ValueType,
        provider: impl SuggestionProvider + 'static,
    ) -> &mut Self {
        self.defaults.insert(value_type, Arc::new(provider));
        self
    }

    pub fn register_named(
        &mut self,
        id: impl Into<String>,
        provider: impl SuggestionProvider + 'static,
    ) -> &mut Self {
        self.named.insert(id.into(), Arc::new(provider));
        self
    }

    /// Suggests the variants of an enumeration type.
    pub fn register_choices(
        &mut self,
        value_type: ValueType,
        variants: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.register_default(value_type, StaticSuggestions::new(variants))
    }

    /// Picks the provider for `parameter`: explicit id first, then the type default.
    ///
    /// A value type without a default provider has no suggestions.
    pub fn resolve(
        &self,
        parameter: &ParameterSpec,
    ) -> Result<Option<&Arc<dyn SuggestionProvider>>, ConfigError> {
        match parameter.suggestion_id() {
            Some(id) => self
                .named
                .get(id)
                .map(Some)
                .ok_or_else(|| ConfigError::UnknownSuggestionProvider(id.to_string())),
            None => Ok(self.defaults.get(parameter.value_type())),
        }
    }

    /// Like [`resolve`](Self::resolve), treating an unknown id as no provider.
    pub fn provider_for(&self, parameter: &ParameterSpec) -> Option<&Arc<dyn SuggestionProvider>> {
        self.resolve(parameter).ok().flatten()
    }
}

impl fmt::Debug for SuggestionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut defaults: Vec<_> = self.defaults.keys().map(ValueType::as_str).collect();
        defaults.sort_unstable();
        let mut named: Vec<_> = self.named.keys().collect();
        named.sort_unstable();
        f.debug_struct("SuggestionRegistry")
            .field("defaults", &defaults)
            .field("named", &named)
            .finish()
    }
}
