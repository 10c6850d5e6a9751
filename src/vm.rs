use crate::errors::FormError;
use crate::format::FormatError;
use crate::registry::FormatRegistry;
use crate::schema::{Conformance, Schema, SchemaNode, Type, Violation};
use crate::validator::{ErrorKind, ValidationError};
use failure::Error;
use indexmap::IndexMap;
use json_pointer::JsonPointer;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::trace;

pub enum EvalError {
    Internal,
    Actual(Error),
}

pub struct Vm<'a> {
    max_errors: usize,
    max_depth: usize,
    formats: &'a FormatRegistry,
    empty: &'a SchemaNode,
    root_path: String,
    path_tokens: Vec<Cow<'a, str>>,
    depth: usize,
    errors: Vec<ValidationError>,
}

impl<'a> Vm<'a> {
    pub fn new(
        max_errors: usize,
        max_depth: usize,
        formats: &'a FormatRegistry,
        empty: &'a SchemaNode,
        root_path: &str,
    ) -> Vm<'a> {
        Vm {
            max_errors,
            max_depth,
            formats,
            empty,
            root_path: root_path.to_owned(),
            path_tokens: vec![],
            depth: 0,
            errors: vec![],
        }
    }

    pub fn finish(self, outcome: Result<(), EvalError>) -> Result<Vec<ValidationError>, Error> {
        match outcome {
            Ok(()) | Err(EvalError::Internal) => Ok(self.errors),
            Err(EvalError::Actual(error)) => Err(error),
        }
    }

    pub fn validate_schema(&mut self, instance: &Value, schema: &'a Schema) -> Result<(), EvalError> {
        if !self.conforms(schema.conformance(), instance)? {
            return Ok(());
        }

        self.validate_object(instance, schema.fields())
    }

    pub fn validate_field(&mut self, instance: &Value, node: &'a SchemaNode) -> Result<(), EvalError> {
        if self.depth == self.max_depth {
            return Err(EvalError::Actual(
                FormError::MaxDepthExceeded {
                    max_depth: self.max_depth,
                }
                .into(),
            ));
        }

        self.depth += 1;
        let outcome = self.eval_field(instance, node);
        self.depth -= 1;
        outcome
    }

    fn eval_field(&mut self, instance: &Value, node: &'a SchemaNode) -> Result<(), EvalError> {
        trace!(path = %self.path(), "validating entry");

        if !self.conforms(node.conformance(), instance)? {
            return Ok(());
        }

        if let Some(typ) = node.typ() {
            self.validate_type(instance, typ, node)?;
        }

        if let Some(properties) = node.properties() {
            self.validate_object(instance, properties)?;
        }

        if let Some(items) = node.items() {
            self.validate_array(instance, items)?;
        }

        if let Some(format) = node.format() {
            self.validate_format(instance, format)?;
        }

        Ok(())
    }

    pub fn validate_type(
        &mut self,
        instance: &Value,
        typ: &Type,
        node: &'a SchemaNode,
    ) -> Result<(), EvalError> {
        match typ {
            Type::Object => match instance.as_object() {
                Some(object) => {
                    if let Some(properties) = node.properties() {
                        self.check_properties(object, properties, SchemaNode::is_required)?;
                    }
                }
                None => self.push_type_err(typ)?,
            },
            Type::String => {
                // Every value has a string form, so only the pattern can fail.
                if let Some(pattern) = node.pattern() {
                    let coerced: Cow<str> = match instance {
                        Value::String(s) => Cow::Borrowed(s),
                        other => Cow::Owned(other.to_string()),
                    };

                    match pattern.matches_start(&coerced) {
                        Ok(true) => {}
                        Ok(false) => self.push_err(ErrorKind::Pattern, |path| {
                            format!("Invalid pattern for {}", path)
                        })?,
                        Err(reason) => self.push_err(ErrorKind::Pattern, |_| reason.to_owned())?,
                    }
                }
            }
            Type::Array => match instance.as_array() {
                Some(elements) => {
                    let items = node.items().unwrap_or(self.empty);
                    self.check_elements(elements, items)?;
                }
                None => self.push_type_err(typ)?,
            },
            Type::Number => {
                if !coerces_to_number(instance) {
                    self.push_type_err(typ)?;
                }
            }
            Type::Boolean => {
                if !instance.is_boolean() {
                    self.push_type_err(typ)?;
                }
            }
            Type::Null => {
                if !instance.is_null() {
                    self.push_type_err(typ)?;
                }
            }
            Type::Unknown(_) => {}
        }

        Ok(())
    }

    pub fn validate_object(
        &mut self,
        instance: &Value,
        properties: &'a IndexMap<String, SchemaNode>,
    ) -> Result<(), EvalError> {
        trace!(path = %self.path(), "validating object");

        match instance.as_object() {
            Some(object) => self.check_properties(object, properties, SchemaNode::has_required_key),
            None => self.push_type_err(&Type::Object),
        }
    }

    pub fn validate_array(&mut self, instance: &Value, items: &'a SchemaNode) -> Result<(), EvalError> {
        trace!(path = %self.path(), "validating array");

        match instance.as_array() {
            Some(elements) => self.check_elements(elements, items),
            None => self.push_type_err(&Type::Array),
        }
    }

    pub fn validate_format(&mut self, instance: &Value, format: &str) -> Result<(), EvalError> {
        trace!(path = %self.path(), format, "validating format");

        let formats = self.formats;
        let rule = match formats.get(format) {
            Some(rule) => rule,
            None => return Ok(()),
        };

        let outcome = match instance.as_str() {
            Some(value) => rule.check(value),
            None => Err(FormatError::NotAString),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(err) => self.push_err(ErrorKind::Format, |path| {
                format!("Invalid format for {}. {}", path, err)
            }),
        }
    }

    /// Visit every declared property present in `object`, and flag the absent
    /// ones `required` says must be there.
    fn check_properties(
        &mut self,
        object: &Map<String, Value>,
        properties: &'a IndexMap<String, SchemaNode>,
        required: fn(&SchemaNode) -> bool,
    ) -> Result<(), EvalError> {
        for (key, node) in properties {
            self.push_path_token(key.as_str());
            match object.get(key) {
                Some(value) => self.validate_field(value, node)?,
                None if required(node) => self.push_err(ErrorKind::Required, |path| {
                    format!("Field {} is required", path)
                })?,
                None => {}
            }
            self.pop_path_token();
        }

        Ok(())
    }

    fn check_elements(&mut self, elements: &[Value], items: &'a SchemaNode) -> Result<(), EvalError> {
        for (index, element) in elements.iter().enumerate() {
            self.push_path_token(index.to_string());
            self.validate_field(element, items)?;
            self.pop_path_token();
        }

        Ok(())
    }

    /// Run the whole-node conformance check, if the node has one. Returns
    /// whether the instance passed.
    fn conforms(
        &mut self,
        conformance: Option<&Conformance>,
        instance: &Value,
    ) -> Result<bool, EvalError> {
        let Violation { location, detail } =
            match conformance.and_then(|c| c.first_violation(instance)) {
                Some(violation) => violation,
                None => return Ok(true),
            };

        let depth = self.path_tokens.len();
        self.path_tokens.extend(location.into_iter().map(Cow::Owned));
        let outcome = self.push_err(ErrorKind::Schema, |path| {
            format!("Validation error at {}: {}", path, detail)
        });
        self.path_tokens.truncate(depth);

        outcome.map(|()| false)
    }

    fn push_path_token<T: Into<Cow<'a, str>>>(&mut self, token: T) {
        self.path_tokens.push(token.into());
    }

    fn pop_path_token(&mut self) {
        self.path_tokens.pop();
    }

    /// The dotted path of the current position.
    fn path(&self) -> String {
        self.path_tokens
            .iter()
            .fold(self.root_path.clone(), |path, token| {
                if path.is_empty() {
                    token.to_string()
                } else {
                    format!("{}.{}", path, token)
                }
            })
    }

    fn push_type_err(&mut self, expected: &Type) -> Result<(), EvalError> {
        self.push_err(ErrorKind::Type, |path| {
            format!("Invalid type for {}. Expected {}.", path, expected.name())
        })
    }

    fn push_err<F>(&mut self, kind: ErrorKind, message: F) -> Result<(), EvalError>
    where
        F: FnOnce(&str) -> String,
    {
        let path = self.path();
        let message = message(&path);
        let instance_path =
            JsonPointer::new(self.path_tokens.iter().map(|t| t.to_string()).collect());

        self.errors
            .push(ValidationError::new(kind, path, instance_path, message));

        if self.errors.len() == self.max_errors {
            Err(EvalError::Internal)
        } else {
            Ok(())
        }
    }
}

/// Numbers, booleans and numeric strings all count as numbers.
fn coerces_to_number(value: &Value) -> bool {
    match value {
        Value::Number(_) | Value::Bool(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}
