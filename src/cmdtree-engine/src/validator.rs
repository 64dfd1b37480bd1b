//! Constraint validators and their registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex_lite::Regex;

use crate::error::ConfigError;
use crate::sender::Sender;
use crate::tree::Constraint;
use crate::value::Value;

/// Checks a converted value against one constraint.
pub trait Validator: Send + Sync {
    /// Returns a message describing the violation, if any.
    fn validate(
        &self,
        sender: &dyn Sender,
        value: &Value,
        constraint: &Constraint,
    ) -> Result<(), String>;

    /// Checks the constraint argument once, when the dispatcher is built.
    fn check_constraint(&self, _constraint: &Constraint) -> Result<(), String> {
        Ok(())
    }
}

// ============================================================
// BUILT-IN VALIDATORS
// ============================================================

/// Parses `"min..max"` where either side may be omitted.
fn parse_bounds(constraint: &Constraint) -> Result<(Option<f64>, Option<f64>), String> {
    let argument = constraint
        .argument
        .as_deref()
        .ok_or_else(|| "expected an argument of the form min..max".to_string())?;
    let (min, max) = argument
        .split_once("..")
        .ok_or_else(|| format!("'{argument}' is not of the form min..max"))?;

    let bound = |side: &str| -> Result<Option<f64>, String> {
        let side = side.trim();
        if side.is_empty() {
            return Ok(None);
        }
        side.parse::<f64>()
            .map(Some)
            .map_err(|_| format!("'{side}' is not a number"))
    };
    Ok((bound(min)?, bound(max)?))
}

fn check_bounds(n: f64, min: Option<f64>, max: Option<f64>, what: &str) -> Result<(), String> {
    if let Some(min) = min
        && n < min
    {
        return Err(format!("{what} must be at least {min}"));
    }
    if let Some(max) = max
        && n > max
    {
        return Err(format!("{what} must be at most {max}"));
    }
    Ok(())
}

/// Inclusive numeric range, `range("1..10")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeValidator;

impl Validator for RangeValidator {
    fn validate(&self, _: &dyn Sender, value: &Value, constraint: &Constraint) -> Result<(), String> {
        let (min, max) = parse_bounds(constraint)?;
        let n = value
            .as_float()
            .ok_or_else(|| format!("{} is not a number", value.kind_name()))?;
        check_bounds(n, min, max, "value")
    }

    fn check_constraint(&self, constraint: &Constraint) -> Result<(), String> {
        parse_bounds(constraint).map(|_| ())
    }
}

/// Inclusive bounds on text length in characters, `length("3..16")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthValidator;

impl Validator for LengthValidator {
    fn validate(&self, _: &dyn Sender, value: &Value, constraint: &Constraint) -> Result<(), String> {
        let (min, max) = parse_bounds(constraint)?;
        let text = value
            .as_str()
            .ok_or_else(|| format!("{} is not text", value.kind_name()))?;
        check_bounds(text.chars().count() as f64, min, max, "length")
    }

    fn check_constraint(&self, constraint: &Constraint) -> Result<(), String> {
        parse_bounds(constraint).map(|_| ())
    }
}

/// Whole-token regular expression match, `pattern("[a-z]+")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternValidator;

impl PatternValidator {
    fn compile(constraint: &Constraint) -> Result<Regex, String> {
        let pattern = constraint
            .argument
            .as_deref()
            .ok_or_else(|| "expected a regular expression".to_string())?;
        Regex::new(&format!("^(?:{pattern})$")).map_err(|e| e.to_string())
    }
}

impl Validator for PatternValidator {
    fn validate(&self, _: &dyn Sender, value: &Value, constraint: &Constraint) -> Result<(), String> {
        let regex = Self::compile(constraint)?;
        let text = value
            .as_str()
            .ok_or_else(|| format!("{} is not text", value.kind_name()))?;
        if regex.is_match(text) {
            Ok(())
        } else {
            Err(format!("'{text}' does not match the expected format"))
        }
    }

    fn check_constraint(&self, constraint: &Constraint) -> Result<(), String> {
        Self::compile(constraint).map(|_| ())
    }
}

/// Rejects empty or whitespace-only text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlankValidator;

impl Validator for NotBlankValidator {
    fn validate(&self, _: &dyn Sender, value: &Value, _: &Constraint) -> Result<(), String> {
        match value.as_str() {
            Some(text) if text.trim().is_empty() => Err("must not be blank".to_string()),
            _ => Ok(()),
        }
    }
}

// ============================================================
// REGISTRY
// ============================================================

/// Validators keyed by constraint name.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `range`, `length`, `pattern` and `not_blank`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("range", RangeValidator)
            .register("length", LengthValidator)
            .register("pattern", PatternValidator)
            .register("not_blank", NotBlankValidator);
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> &mut Self {
        self.validators.insert(name.into(), Arc::new(validator));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Validator>> {
        self.validators.get(name)
    }

    /// Looks up the validator for `constraint` and checks its argument.
    pub fn check(&self, constraint: &Constraint) -> Result<(), ConfigError> {
        let validator = self
            .get(&constraint.name)
            .ok_or_else(|| ConfigError::UnknownValidator(constraint.name.clone()))?;
        validator
            .check_constraint(constraint)
            .map_err(|message| ConfigError::InvalidConstraint {
                constraint: constraint.to_string(),
                message,
            })
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort_unstable();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &names)
            .finish()
    }
}
