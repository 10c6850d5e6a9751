//! Validate form data against schemas.
//!
//! This module contains the validation engine. A [`Validator`](struct.Validator.html)
//! owns a [`Schema`](../schema/struct.Schema.html) and checks input data (an
//! "instance") against it, producing every problem it finds.
//!
//! Each check can also be run on its own, against any node: see
//! [`Validator::validate_field`](struct.Validator.html#method.validate_field)
//! and its siblings.

use crate::format::FormatRule;
use crate::registry::FormatRegistry;
use crate::schema::{Schema, SchemaNode, Type};
use crate::vm::{EvalError, Vm};
use failure::Error;
use indexmap::IndexMap;
use json_pointer::JsonPointer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Validates instances against a schema.
#[derive(Debug)]
pub struct Validator {
    schema: Schema,
    config: Config,
    formats: FormatRegistry,
}

impl Validator {
    /// Constructs a new validator using the default configuration.
    pub fn new(schema: Schema) -> Self {
        Self::new_with_config(schema, Config::default())
    }

    /// Constructs a new validator using a configuration.
    ///
    /// The built-in `date` and `email` format rules are registered here, with
    /// `date` accepting the configured date formats.
    pub fn new_with_config(schema: Schema, config: Config) -> Self {
        let formats = FormatRegistry::with_builtins(&config.date_formats);
        Self {
            schema,
            config,
            formats,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Register a format rule, replacing any rule of the same name.
    pub fn register_format<N, R>(&mut self, name: N, rule: R) -> Option<Box<dyn FormatRule>>
    where
        N: Into<String>,
        R: FormatRule + 'static,
    {
        self.formats.register(name, rule)
    }

    /// Validate form data against the whole schema.
    ///
    /// `path` labels the root of the data; errors at top-level field `name`
    /// are reported at `{path}.name` (or just `name` if `path` is empty).
    ///
    /// The schema as a whole is first checked for conformance; if that fails,
    /// its one error is all that is returned. Otherwise every top-level field
    /// is checked. An empty list means the data is valid.
    ///
    /// Despite having "Error" in their name, the returned
    /// [`ValidationError`](struct.ValidationError.html)s are not Rust errors.
    /// This returns `Err` only if the maximum depth is exceeded (see
    /// [`Config::max_depth`](struct.Config.html#method.max_depth)).
    pub fn validate_schema(&self, form_data: &Value, path: &str) -> Result<Vec<ValidationError>, Error> {
        let result = self.run(path, |vm| vm.validate_schema(form_data, &self.schema));

        if let Ok(errors) = &result {
            debug!(path, errors = errors.len(), "form validated");
        }

        result
    }

    /// Validate a value against one schema node.
    ///
    /// After the node's conformance check passes, this runs the type, object,
    /// array and format checks, in that order, for each of `type`,
    /// `properties`, `items` and `format` the node declares. A node declaring
    /// both `type: object` and `properties` is therefore walked twice, and so
    /// is one declaring `type: array` and `items`.
    pub fn validate_field(
        &self,
        value: &Value,
        node: &SchemaNode,
        path: &str,
    ) -> Result<Vec<ValidationError>, Error> {
        self.run(path, |vm| vm.validate_field(value, node))
    }

    /// Validate a value against one of the type names.
    ///
    /// For `object`, an absent property is flagged only when its `required`
    /// value is truthy. For `string`, the node's `pattern` must match at the
    /// start of the value; a value that is not a string is matched in its
    /// compact JSON form (`true`, `null`, `{"a":1}`). For `array`, elements
    /// are checked against the node's `items`. Unknown types accept
    /// everything.
    pub fn validate_type(
        &self,
        value: &Value,
        expected: &Type,
        node: &SchemaNode,
        path: &str,
    ) -> Result<Vec<ValidationError>, Error> {
        self.run(path, |vm| vm.validate_type(value, expected, node))
    }

    /// Validate that a value is an object whose declared properties are valid.
    ///
    /// An absent property is flagged whenever its node has a `required` key,
    /// whatever that key's value.
    pub fn validate_object(
        &self,
        value: &Value,
        properties: &IndexMap<String, SchemaNode>,
        path: &str,
    ) -> Result<Vec<ValidationError>, Error> {
        self.run(path, |vm| vm.validate_object(value, properties))
    }

    /// Validate that a value is an array whose elements all satisfy `items`.
    pub fn validate_array(
        &self,
        value: &Value,
        items: &SchemaNode,
        path: &str,
    ) -> Result<Vec<ValidationError>, Error> {
        self.run(path, |vm| vm.validate_array(value, items))
    }

    /// Validate a value with the format rule registered as `format_name`.
    ///
    /// If no such rule is registered, every value is accepted.
    pub fn validate_format(
        &self,
        value: &Value,
        format_name: &str,
        path: &str,
    ) -> Result<Vec<ValidationError>, Error> {
        self.run(path, |vm| vm.validate_format(value, format_name))
    }

    fn run<'a, F>(&'a self, path: &str, op: F) -> Result<Vec<ValidationError>, Error>
    where
        F: FnOnce(&mut Vm<'a>) -> Result<(), EvalError>,
    {
        let mut vm = Vm::new(
            self.config.max_errors,
            self.config.max_depth,
            &self.formats,
            self.schema.empty_node(),
            path,
        );

        let outcome = op(&mut vm);
        vm.finish(outcome)
    }
}

/// Configuration for how validation should proceed.
#[derive(Debug, Eq, PartialEq, Clone, Hash, Deserialize)]
#[serde(default)]
pub struct Config {
    max_errors: usize,
    max_depth: usize,
    date_formats: Vec<String>,
}

impl Config {
    /// Create a new, default `Config`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of errors to produce before stopping validation.
    /// 0, the default value, indicates that all errors should be produced.
    pub fn max_errors(&mut self, max_errors: usize) -> &mut Self {
        self.max_errors = max_errors;
        self
    }

    /// Sets how deeply fields may nest before aborting evaluation. The
    /// default is 64.
    ///
    /// When evaluation is aborted because of this maximum depth, validation
    /// *fails*. No validation errors are returned.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the patterns the built-in `date` format accepts, in strftime
    /// syntax. The default accepts only `%Y-%m-%d`.
    pub fn date_formats<I, S>(&mut self, date_formats: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = date_formats.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_errors: 0,
            max_depth: 64,
            date_formats: vec!["%Y-%m-%d".to_owned()],
        }
    }
}

/// The categories of problems validation can find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The node-wide conformance check failed.
    Schema,
    Type,
    Required,
    Pattern,
    Format,
}

/// Contains a single problem with an instance.
///
/// Note that, despite its name, `ValidationError` is not an error in the usual
/// Rust sense. It is an ordinary struct, which happens to contain information
/// about why some data was unsatisfactory against a given schema. Its
/// `Display` form is the full human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    kind: ErrorKind,
    path: String,
    instance_path: JsonPointer<String, Vec<String>>,
    message: String,
}

impl ValidationError {
    pub fn new(
        kind: ErrorKind,
        path: String,
        instance_path: JsonPointer<String, Vec<String>>,
        message: String,
    ) -> ValidationError {
        ValidationError {
            kind,
            path,
            instance_path,
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The dotted path of the rejected field, starting with the root label.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A pointer into the part of the instance which was rejected. Unlike
    /// [`path`](#method.path), it does not include the root label.
    pub fn instance_path(&self) -> &JsonPointer<String, Vec<String>> {
        &self.instance_path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
