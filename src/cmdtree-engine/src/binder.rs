//! Conversion of raw tokens into the typed argument vector of one candidate.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{ConfigError, DispatchError, InvocationError};
use crate::parser::ParserRegistry;
use crate::sender::Sender;
use crate::tree::{CommandNode, ParameterSpec, SubcommandDefinition};
use crate::validator::ValidatorRegistry;
use crate::value::{Arguments, Value};

/// Binds tokens to subcommand candidates using the parser and validator registries.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentBinder<'r> {
    parsers: &'r ParserRegistry,
    validators: &'r ValidatorRegistry,
}

impl<'r> ArgumentBinder<'r> {
    pub fn new(parsers: &'r ParserRegistry, validators: &'r ValidatorRegistry) -> Self {
        Self {
            parsers,
            validators,
        }
    }

    /// Binds `tokens` to `definition`.
    ///
    /// Per-input failures come back as [`DispatchError::Invocation`]; a missing
    /// parser or validator is a [`DispatchError::Config`].
    pub fn bind<T: AsRef<str>>(
        &self,
        definition: &SubcommandDefinition,
        sender: &Arc<dyn Sender>,
        tokens: &[T],
    ) -> Result<Arguments, DispatchError> {
        let parameters = definition.parameters();

        if let Some(index) = definition.sender_index() {
            let expected = parameters[index].value_type();
            if !sender.is_instance_of(expected) {
                return Err(InvocationError::SenderTypeMismatch {
                    subcommand: definition.path().to_string(),
                    expected: expected.clone(),
                    actual: sender.value_type(),
                }
                .into());
            }
        }

        let mut slots: Vec<Option<Value>> = vec![None; parameters.len()];
        let mut cursor = 0;

        for (index, parameter) in parameters.iter().enumerate() {
            if parameter.is_sender() || parameter.is_variadic() {
                continue;
            }
            let token = tokens.get(cursor).ok_or_else(|| {
                InvocationError::IncorrectArgumentCount {
                    command: definition.path().to_string(),
                    provided: tokens.len(),
                    rejected: vec![definition.signature()],
                }
            })?;
            slots[index] = Some(self.convert(parameter, token.as_ref())?);
            cursor += 1;
        }

        for (parameter, slot) in parameters.iter().zip(&slots) {
            if let Some(value) = slot {
                self.validate(sender.as_ref(), parameter, value)?;
            }
        }

        if let Some(index) = definition.sender_index() {
            slots[index] = Some(Value::Sender(Arc::clone(sender)));
        }

        if let Some(variadic) = parameters.last().filter(|p| p.is_variadic()) {
            let rest = tokens.get(cursor..).unwrap_or_default();
            let mut elements = Vec::with_capacity(rest.len());
            for token in rest {
                let element = self.convert(variadic, token.as_ref())?;
                self.validate(sender.as_ref(), variadic, &element)?;
                elements.push(element);
            }
            slots[parameters.len() - 1] = Some(Value::List(elements));
        }

        Ok(Arguments::new(slots.into_iter().flatten().collect()))
    }

    /// Tries `candidates` in order and returns the first that binds.
    ///
    /// When every candidate fails, the error of the last one attempted is returned.
    pub fn bind_first<'d, T: AsRef<str>>(
        &self,
        command: &CommandNode,
        candidates: &[&'d Arc<SubcommandDefinition>],
        sender: &Arc<dyn Sender>,
        tokens: &[T],
    ) -> Result<(&'d Arc<SubcommandDefinition>, Arguments), DispatchError> {
        let mut last_error = None;
        for &candidate in candidates {
            match self.bind(candidate, sender, tokens) {
                Ok(arguments) => {
                    debug!(subcommand = candidate.path(), "candidate bound");
                    return Ok((candidate, arguments));
                }
                Err(DispatchError::Invocation(err)) => {
                    debug!(subcommand = candidate.path(), error = %err, "candidate rejected");
                    last_error = Some(err);
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_error
            .unwrap_or_else(|| InvocationError::SubcommandNotFound {
                command: command.path().to_string(),
            })
            .into())
    }

    fn convert(&self, parameter: &ParameterSpec, token: &str) -> Result<Value, DispatchError> {
        let value = match self.parsers.resolve(parameter)? {
            Some(parser) => parser
                .parse(token)
                .map_err(|message| InvocationError::ArgumentParse {
                    parameter: parameter.name().to_string(),
                    token: token.to_string(),
                    message,
                })?,
            None => Value::Text(token.to_string()),
        };
        trace!(parameter = parameter.name(), token, value = ?value, "converted token");
        Ok(value)
    }

    fn validate(
        &self,
        sender: &dyn Sender,
        parameter: &ParameterSpec,
        value: &Value,
    ) -> Result<(), DispatchError> {
        for constraint in parameter.constraints() {
            let validator = self
                .validators
                .get(&constraint.name)
                .ok_or_else(|| ConfigError::UnknownValidator(constraint.name.clone()))?;
            validator
                .validate(sender, value, constraint)
                .map_err(|message| InvocationError::ArgumentValidation {
                    parameter: parameter.name().to_string(),
                    constraint: constraint.to_string(),
                    message,
                })?;
        }
        Ok(())
    }
}
