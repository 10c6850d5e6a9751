//! A serde-friendly representation of schema nodes.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A serialization/deserialization-friendly representation of one schema
/// node.
///
/// This struct is excellent for parsing schema files, but does not interpret
/// anything: an unknown `type` is kept as-is, and so is every keyword this
/// crate does not act on (those land in `extra` and still take part in the
/// conformance check). Convert it into a
/// [`SchemaNode`](../schema/struct.SchemaNode.html) to validate with it.
///
/// Property order is preserved, so errors come out in the order the schema
/// declares its fields.
#[derive(Debug, PartialEq, Deserialize, Serialize, Default, Clone)]
pub struct SerdeSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub typ: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "properties")]
    pub props: Option<IndexMap<String, SerdeSchema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SerdeSchema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// `Some` whenever the key is present, even when its value is `null`.
    #[serde(default, deserialize_with = "present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Value>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrip_json() {
        let data = r#"{
  "type": "object",
  "properties": {
    "a": {}
  },
  "items": {},
  "format": "date",
  "pattern": "^a",
  "required": true,
  "enum": [
    "a"
  ]
}"#;

        let parsed: SerdeSchema = serde_json::from_str(data).expect("failed to parse json");
        assert_eq!(
            parsed,
            SerdeSchema {
                typ: Some(json!("object")),
                props: Some(
                    [("a".to_owned(), SerdeSchema::default())]
                        .iter()
                        .cloned()
                        .collect()
                ),
                items: Some(Box::new(SerdeSchema::default())),
                format: Some(json!("date")),
                pattern: Some("^a".to_owned()),
                required: Some(json!(true)),
                extra: [("enum".to_owned(), json!(["a"]))]
                    .iter()
                    .cloned()
                    .collect(),
            }
        );

        let round_trip = serde_json::to_string_pretty(&parsed).expect("failed to serialize json");
        assert_eq!(round_trip, data);
    }

    #[test]
    fn null_required_is_present() {
        let parsed: SerdeSchema =
            serde_json::from_value(json!({ "required": null })).expect("failed to parse json");
        assert_eq!(parsed.required, Some(Value::Null));

        let parsed: SerdeSchema = serde_json::from_value(json!({})).expect("failed to parse json");
        assert_eq!(parsed.required, None);
    }

    #[test]
    fn property_order_is_kept() {
        let parsed: SerdeSchema = serde_json::from_str(
            r#"{ "properties": { "zeta": {}, "alpha": {}, "mid": {} } }"#,
        )
        .expect("failed to parse json");

        let names: Vec<&str> = parsed
            .props
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
