//! Schema representations.
//!
//! A [`Schema`](struct.Schema.html) is the root of a schema definition: a
//! mapping from top-level field name directly to its
//! [`SchemaNode`](struct.SchemaNode.html). There is no enclosing `type` or
//! `properties` wrapper at the root, while nested object nodes do declare
//! their children under `properties`.
//!
//! Both are built once, up front, and are read-only afterwards. They are
//! `Send + Sync`, so one schema can serve any number of concurrent
//! validations.

use crate::errors::FormError;
use crate::serde::SerdeSchema;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Type names the conformance check understands.
const JSON_SCHEMA_TYPES: &[&str] = &[
    "object", "string", "array", "number", "integer", "boolean", "null",
];

/// The root of a schema: top-level field names mapped to their nodes.
#[derive(Debug)]
pub struct Schema {
    fields: IndexMap<String, SchemaNode>,
    conformance: Option<Conformance>,
    empty: SchemaNode,
}

impl Schema {
    /// Construct a schema from its serde representation.
    pub fn from_serde(fields: IndexMap<String, SerdeSchema>) -> Result<Schema, FormError> {
        let document = to_document(&fields)?;

        let mut nodes = IndexMap::with_capacity(fields.len());
        for (name, field) in fields {
            nodes.insert(name, SchemaNode::from_serde(field)?);
        }

        Ok(Schema {
            fields: nodes,
            conformance: Conformance::compile(&document),
            empty: SchemaNode::default(),
        })
    }

    /// Construct a schema from a JSON value.
    ///
    /// The value must be an object, and so must every node inside it.
    pub fn from_value(value: Value) -> Result<Schema, FormError> {
        let fields: IndexMap<String, SerdeSchema> =
            serde_json::from_value(value).map_err(|err| FormError::InvalidNode {
                reason: err.to_string(),
            })?;

        Self::from_serde(fields)
    }

    /// Load a schema from a JSON file.
    ///
    /// A missing file is reported as
    /// [`FormError::SchemaNotFound`](../errors/enum.FormError.html), anything
    /// else that prevents reading or parsing it as
    /// `FormError::SchemaUnreadable`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Schema, FormError> {
        let path = path.as_ref().display().to_string();

        let text = fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => FormError::SchemaNotFound { path: path.clone() },
            _ => FormError::SchemaUnreadable {
                path: path.clone(),
                reason: err.to_string(),
            },
        })?;

        let value: Value =
            serde_json::from_str(&text).map_err(|err| FormError::SchemaUnreadable {
                path: path.clone(),
                reason: err.to_string(),
            })?;

        let schema = Self::from_value(value)?;
        info!(path = %path, fields = schema.fields.len(), "schema loaded");
        Ok(schema)
    }

    /// The top-level fields, in declaration order.
    pub fn fields(&self) -> &IndexMap<String, SchemaNode> {
        &self.fields
    }

    /// Look up a single top-level field.
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.get(name)
    }

    pub(crate) fn conformance(&self) -> Option<&Conformance> {
        self.conformance.as_ref()
    }

    /// The node used for arrays whose schema declares no `items`.
    pub(crate) fn empty_node(&self) -> &SchemaNode {
        &self.empty
    }
}

impl FromStr for Schema {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Schema, FormError> {
        let value: Value = serde_json::from_str(s).map_err(|err| FormError::InvalidNode {
            reason: err.to_string(),
        })?;

        Self::from_value(value)
    }
}

/// One node of the schema tree.
#[derive(Debug, Default)]
pub struct SchemaNode {
    typ: Option<Type>,
    properties: Option<IndexMap<String, SchemaNode>>,
    items: Option<Box<SchemaNode>>,
    format: Option<String>,
    pattern: Option<Pattern>,
    required: Option<Value>,
    conformance: Option<Conformance>,
}

impl SchemaNode {
    /// Construct a node (and its whole subtree) from its serde
    /// representation.
    pub fn from_serde(serde_schema: SerdeSchema) -> Result<SchemaNode, FormError> {
        let document = to_document(&serde_schema)?;

        let properties = match serde_schema.props {
            Some(props) => {
                let mut nodes = IndexMap::with_capacity(props.len());
                for (name, prop) in props {
                    nodes.insert(name, SchemaNode::from_serde(prop)?);
                }
                Some(nodes)
            }
            None => None,
        };

        let items = match serde_schema.items {
            Some(items) => Some(Box::new(SchemaNode::from_serde(*items)?)),
            None => None,
        };

        Ok(SchemaNode {
            typ: serde_schema.typ.as_ref().map(Type::from_value),
            properties,
            items,
            // A non-string format can never name a registered rule.
            format: serde_schema
                .format
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_owned),
            pattern: serde_schema.pattern.map(Pattern::new),
            required: serde_schema.required,
            conformance: Conformance::compile(&document),
        })
    }

    /// Construct a node from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<SchemaNode, FormError> {
        let serde_schema: SerdeSchema =
            serde_json::from_value(value).map_err(|err| FormError::InvalidNode {
                reason: err.to_string(),
            })?;

        Self::from_serde(serde_schema)
    }

    /// The declared `type`, if any.
    pub fn typ(&self) -> Option<&Type> {
        self.typ.as_ref()
    }

    /// The declared child nodes, if any.
    pub fn properties(&self) -> Option<&IndexMap<String, SchemaNode>> {
        self.properties.as_ref()
    }

    /// The node every array element must satisfy, if any.
    pub fn items(&self) -> Option<&SchemaNode> {
        self.items.as_deref()
    }

    /// The name of the format rule to apply, if any.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    /// Whether the node carries a `required` key at all, whatever its value.
    pub fn has_required_key(&self) -> bool {
        self.required.is_some()
    }

    /// Whether the node carries a `required` key with a truthy value.
    pub fn is_required(&self) -> bool {
        self.required.as_ref().map_or(false, is_truthy)
    }

    pub(crate) fn conformance(&self) -> Option<&Conformance> {
        self.conformance.as_ref()
    }
}

/// The values the `type` keyword may name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Object,
    String,
    Array,
    Number,
    Boolean,
    Null,

    /// Anything else, kept as its JSON text. Checking against an unknown type
    /// always succeeds.
    Unknown(String),
}

impl Type {
    fn from_value(value: &Value) -> Type {
        match value.as_str() {
            Some("object") => Type::Object,
            Some("string") => Type::String,
            Some("array") => Type::Array,
            Some("number") => Type::Number,
            Some("boolean") => Type::Boolean,
            Some("null") => Type::Null,
            Some(other) => Type::Unknown(other.to_owned()),
            None => Type::Unknown(value.to_string()),
        }
    }

    /// The name of the type, as written in schemas.
    pub fn name(&self) -> &str {
        match self {
            Type::Object => "object",
            Type::String => "string",
            Type::Array => "array",
            Type::Number => "number",
            Type::Boolean => "boolean",
            Type::Null => "null",
            Type::Unknown(name) => name.as_str(),
        }
    }
}

/// A regular expression from a `pattern` keyword.
///
/// A pattern that fails to compile is still kept: validating against it
/// reports the compilation error instead of a mismatch.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Result<Regex, String>,
}

impl Pattern {
    pub fn new(source: String) -> Pattern {
        let compiled = Regex::new(&source).map_err(|err| err.to_string());
        Pattern { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches at the very start of `haystack`. The match
    /// does not need to reach the end.
    ///
    /// Returns the compilation error if the pattern is malformed.
    pub fn matches_start(&self, haystack: &str) -> Result<bool, &str> {
        match &self.compiled {
            // Leftmost-first: if any match starts at 0, this one does.
            Ok(regex) => Ok(regex.find(haystack).map_or(false, |m| m.start() == 0)),
            Err(reason) => Err(reason.as_str()),
        }
    }
}

/// A whole-node JSON Schema check, compiled once per node.
pub(crate) struct Conformance {
    validator: jsonschema::Validator,
}

/// The first thing a [`Conformance`] check found wrong.
pub(crate) struct Violation {
    /// Location of the violation relative to the checked value.
    pub(crate) location: Vec<String>,
    pub(crate) detail: String,
}

impl Conformance {
    fn compile(document: &Value) -> Option<Conformance> {
        let document = sanitize(document);

        let mut options = jsonschema::options();
        options
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(false);

        match options.build(&document) {
            Ok(validator) => Some(Conformance { validator }),
            Err(err) => {
                warn!(error = %err, "schema node cannot be compiled, skipping its conformance check");
                None
            }
        }
    }

    pub(crate) fn first_violation(&self, instance: &Value) -> Option<Violation> {
        self.validator
            .iter_errors(instance)
            .next()
            .map(|err| Violation {
                location: pointer_tokens(&err.instance_path.to_string()),
                detail: err.to_string(),
            })
    }
}

impl fmt::Debug for Conformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Conformance")
    }
}

fn to_document<T: serde::Serialize>(schema: &T) -> Result<Value, FormError> {
    serde_json::to_value(schema).map_err(|err| FormError::InvalidNode {
        reason: err.to_string(),
    })
}

/// Strip the keywords whose meaning in this dialect is not valid JSON Schema,
/// leaving them to the finer-grained checkers.
fn sanitize(document: &Value) -> Value {
    let object = match document.as_object() {
        Some(object) => object,
        None => return document.clone(),
    };

    let mut out = Map::with_capacity(object.len());
    for (keyword, value) in object {
        let value = match keyword.as_str() {
            "required" if !value.is_array() => continue,
            "type" if !is_json_schema_type(value) => continue,
            "pattern" if !value.as_str().map_or(false, |p| Regex::new(p).is_ok()) => continue,
            "properties" => match value.as_object() {
                Some(props) => Value::Object(
                    props
                        .iter()
                        .map(|(name, prop)| (name.clone(), sanitize(prop)))
                        .collect(),
                ),
                None => value.clone(),
            },
            "items" => sanitize(value),
            _ => value.clone(),
        };
        out.insert(keyword.clone(), value);
    }

    Value::Object(out)
}

fn is_json_schema_type(value: &Value) -> bool {
    match value {
        Value::String(name) => JSON_SCHEMA_TYPES.contains(&name.as_str()),
        Value::Array(names) => names
            .iter()
            .all(|name| name.as_str().map_or(false, |n| JSON_SCHEMA_TYPES.contains(&n))),
        _ => false,
    }
}

/// Split a JSON pointer into its unescaped reference tokens.
fn pointer_tokens(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn root_keeps_field_order() {
        let schema = Schema::from_value(json!({
            "name": { "type": "string" },
            "age": { "type": "number" },
            "address": { "type": "object", "properties": {} },
        }))
        .unwrap();

        let names: Vec<&str> = schema.fields().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["name", "age", "address"]);
        assert_eq!(schema.field("age").unwrap().typ(), Some(&Type::Number));
    }

    #[test]
    fn non_mapping_nodes_are_rejected() {
        assert!(Schema::from_value(json!(["name"])).is_err());
        assert!(Schema::from_value(json!({ "name": "string" })).is_err());
        assert!(SchemaNode::from_value(json!({ "properties": { "a": 5 } })).is_err());

        match Schema::from_value(json!({ "name": 5 })) {
            Err(FormError::InvalidNode { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_types_are_kept() {
        let node = SchemaNode::from_value(json!({ "type": "strnig" })).unwrap();
        assert_eq!(node.typ(), Some(&Type::Unknown("strnig".to_owned())));
        assert!(node.conformance().is_some());

        let node = SchemaNode::from_value(json!({ "type": ["string", "null"] })).unwrap();
        assert_eq!(node.typ().unwrap().name(), r#"["string","null"]"#);
    }

    #[test]
    fn required_presence_and_truthiness() {
        let cases = vec![
            (json!({}), false, false),
            (json!({ "required": true }), true, true),
            (json!({ "required": false }), true, false),
            (json!({ "required": null }), true, false),
            (json!({ "required": 0 }), true, false),
            (json!({ "required": "" }), true, false),
            (json!({ "required": "yes" }), true, true),
            (json!({ "required": [] }), true, false),
            (json!({ "required": ["a"] }), true, true),
        ];

        for (definition, present, truthy) in cases {
            let node = SchemaNode::from_value(definition.clone()).unwrap();
            assert_eq!(node.has_required_key(), present, "{}", definition);
            assert_eq!(node.is_required(), truthy, "{}", definition);
        }
    }

    #[test]
    fn sanitize_strips_dialect_keywords() {
        let document = json!({
            "type": "object",
            "required": true,
            "properties": {
                "code": { "type": "strnig", "pattern": "[a-", "required": false },
                "tags": { "type": "array", "items": { "type": "string", "required": 1 } },
            },
            "enum": [{ "code": "x" }],
        });

        assert_eq!(
            sanitize(&document),
            json!({
                "type": "object",
                "properties": {
                    "code": {},
                    "tags": { "type": "array", "items": { "type": "string" } },
                },
                "enum": [{ "code": "x" }],
            })
        );
    }

    #[test]
    fn conformance_reports_nested_location() {
        let node = SchemaNode::from_value(json!({
            "type": "object",
            "properties": { "b": { "type": "string", "required": true } },
        }))
        .unwrap();

        let violation = node
            .conformance()
            .unwrap()
            .first_violation(&json!({ "b": 5 }))
            .unwrap();
        assert_eq!(violation.location, vec!["b".to_owned()]);

        assert!(node
            .conformance()
            .unwrap()
            .first_violation(&json!({ "b": "five" }))
            .is_none());
    }

    #[test]
    fn pointer_tokens_are_unescaped() {
        assert_eq!(pointer_tokens(""), Vec::<String>::new());
        assert_eq!(pointer_tokens("/a/0"), vec!["a", "0"]);
        assert_eq!(pointer_tokens("/a~1b/c~0d"), vec!["a/b", "c~d"]);
    }

    #[test]
    fn patterns_match_at_start_only() {
        let pattern = Pattern::new("abc".to_owned());
        assert_eq!(pattern.matches_start("abcdef"), Ok(true));
        assert_eq!(pattern.matches_start("xabc"), Ok(false));

        let malformed = Pattern::new("[a-".to_owned());
        assert!(malformed.matches_start("a").is_err());
        assert_eq!(malformed.source(), "[a-");
    }

    #[test]
    fn parse_from_str() {
        let schema: Schema = r#"{ "email": { "type": "string", "format": "email" } }"#
            .parse()
            .unwrap();
        assert_eq!(schema.field("email").unwrap().format(), Some("email"));

        assert!("not json".parse::<Schema>().is_err());
    }

    #[test]
    fn load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "name": {{ "type": "string", "required": true }} }}"#).unwrap();

        let schema = Schema::from_path(file.path()).unwrap();
        assert!(schema.field("name").unwrap().is_required());
    }

    #[test]
    fn load_errors() {
        match Schema::from_path("/definitely/not/here/schema.json") {
            Err(FormError::SchemaNotFound { path }) => {
                assert_eq!(path, "/definitely/not/here/schema.json")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        match Schema::from_path(file.path()) {
            Err(err @ FormError::SchemaUnreadable { .. }) => {
                assert!(err.to_string().starts_with("Error loading schema: "));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
