use crate::error::{Error, Result};
use crate::rules::{FieldDescriptor, FieldType};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the single child of an array node
pub const ITEMS: &str = "items";

/// Documentation-facing tree for a field or a body.
///
/// Array nodes carry exactly one child named [`ITEMS`]; object nodes carry
/// uniquely named children.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub name: String,
    pub node_type: FieldType,
    pub required: bool,
    pub enum_values: Option<Vec<Value>>,
    pub example: Option<Value>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    pub fn new(name: &str, node_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            node_type,
            required: false,
            enum_values: None,
            example: None,
            description: None,
            format: None,
            pattern: None,
            min: None,
            max: None,
            children: Vec::new(),
        }
    }

    /// An array node whose item template is `items`
    pub fn array_of(name: &str, mut items: SchemaNode) -> Self {
        items.name = ITEMS.to_string();
        let mut node = Self::new(name, FieldType::Array);
        node.children.push(items);
        node
    }

    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.iter().find(|child| child.name == name)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut SchemaNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// The item template of an array node
    pub fn items(&self) -> Option<&SchemaNode> {
        match self.node_type {
            FieldType::Array => self.child(ITEMS),
            _ => None,
        }
    }

    /// Convert to the OpenAPI wire form
    pub fn to_schema(&self) -> Schema {
        let mut schema = Schema {
            enum_values: self.enum_values.clone(),
            example: self.example.clone(),
            description: self.description.clone(),
            format: self.format.clone(),
            pattern: self.pattern.clone(),
            ..Default::default()
        };

        let min = self.min.map(number_value);
        let max = self.max.map(number_value);

        match self.node_type {
            FieldType::File => {
                schema.schema_type = Some("string".to_string());
                schema.format = Some("binary".to_string());
            }
            FieldType::String => {
                schema.schema_type = Some("string".to_string());
                schema.min_length = min;
                schema.max_length = max;
            }
            FieldType::Integer | FieldType::Number => {
                schema.schema_type = Some(self.node_type.as_str().to_string());
                schema.minimum = min;
                schema.maximum = max;
            }
            FieldType::Boolean => {
                schema.schema_type = Some("boolean".to_string());
            }
            FieldType::Array => {
                schema.schema_type = Some("array".to_string());
                schema.min_items = min;
                schema.max_items = max;
                let items = self
                    .items()
                    .map(SchemaNode::to_schema)
                    .unwrap_or_default();
                schema.items = Some(Box::new(items));
            }
            FieldType::Object => {
                schema.schema_type = Some("object".to_string());
                if !self.children.is_empty() {
                    let properties = self
                        .children
                        .iter()
                        .map(|child| (child.name.clone(), child.to_schema()))
                        .collect();
                    schema.properties = Some(properties);

                    let required: Vec<String> = self
                        .children
                        .iter()
                        .filter(|child| child.required)
                        .map(|child| child.name.clone())
                        .collect();
                    if !required.is_empty() {
                        schema.required = Some(required);
                    }
                }
            }
        }

        schema
    }

    /// Overlay a leaf built from a descriptor onto an existing node
    fn merge(&mut self, leaf: SchemaNode) {
        if self.children.is_empty() {
            self.node_type = leaf.node_type;
        }
        self.required |= leaf.required;
        self.enum_values = leaf.enum_values.or(self.enum_values.take());
        self.example = leaf.example.or(self.example.take());
        self.description = leaf.description.or(self.description.take());
        self.format = leaf.format.or(self.format.take());
        self.pattern = leaf.pattern.or(self.pattern.take());
        self.min = leaf.min.or(self.min);
        self.max = leaf.max.or(self.max);
    }
}

/// Integral values serialize as integers
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format hint (e.g., "email", "uuid", "binary")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Value>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<Value>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Schema builder - turns descriptors and sampled values into schema nodes
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Map one descriptor to a node; an absent type means string.
    ///
    /// Fields whose rules produce no message are described by the rules
    /// themselves.
    pub fn from_descriptor(descriptor: &FieldDescriptor) -> SchemaNode {
        let mut description = descriptor
            .messages
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if description.is_empty() && !descriptor.raw_rules.is_empty() {
            description = format!("Validated by: {}.", descriptor.raw_rules.join(", "));
        }

        SchemaNode {
            name: descriptor.name.clone(),
            node_type: descriptor.effective_type(),
            required: descriptor.required,
            enum_values: descriptor.enum_values.clone(),
            example: descriptor.example.clone(),
            description: (!description.is_empty()).then_some(description),
            format: descriptor.format.clone(),
            pattern: descriptor.pattern.clone(),
            min: descriptor.min,
            max: descriptor.max,
            children: Vec::new(),
        }
    }

    /// Build an object node nesting every descriptor under its dotted path.
    ///
    /// `address.city` becomes a `city` child of an `address` object and
    /// `tags.*` the item template of a `tags` array.
    pub fn from_descriptors(name: &str, descriptors: &[FieldDescriptor]) -> SchemaNode {
        let mut root = SchemaNode::new(name, FieldType::Object);

        for descriptor in descriptors {
            let segments: Vec<&str> = descriptor.name.split('.').collect();
            insert(&mut root, &segments, descriptor);
        }

        root
    }

    /// Infer a node from a sampled value.
    ///
    /// Sequences take their item template from the first element; `null` has
    /// no schema.
    pub fn from_value(name: &str, value: &Value) -> Result<SchemaNode> {
        let node = match value {
            Value::Null => {
                return Err(Error::UnsupportedValueType {
                    name: name.to_string(),
                    value_type: "null".to_string(),
                })
            }
            Value::Bool(_) => Self::scalar(name, FieldType::Boolean, value),
            Value::Number(number) => {
                let node_type = if number.is_i64() || number.is_u64() {
                    FieldType::Integer
                } else {
                    FieldType::Number
                };
                Self::scalar(name, node_type, value)
            }
            Value::String(_) => Self::scalar(name, FieldType::String, value),
            Value::Array(values) => {
                let first = values.first().ok_or_else(|| Error::EmptySequenceUnsupported {
                    name: name.to_string(),
                })?;
                SchemaNode::array_of(name, Self::from_value(ITEMS, first)?)
            }
            Value::Object(map) => {
                let mut node = SchemaNode::new(name, FieldType::Object);
                for (key, child) in map {
                    node.children.push(Self::from_value(key, child)?);
                }
                node
            }
        };

        Ok(node)
    }

    fn scalar(name: &str, node_type: FieldType, value: &Value) -> SchemaNode {
        let mut node = SchemaNode::new(name, node_type);
        node.example = Some(value.clone());
        node
    }
}

fn insert(node: &mut SchemaNode, segments: &[&str], descriptor: &FieldDescriptor) {
    let Some((segment, rest)) = segments.split_first() else {
        return;
    };
    let child_name = if *segment == "*" { ITEMS } else { *segment };

    if rest.is_empty() {
        let mut leaf = SchemaBuilder::from_descriptor(descriptor);
        leaf.name = child_name.to_string();
        match node.child_mut(child_name) {
            Some(existing) => existing.merge(leaf),
            None => node.children.push(leaf),
        }
        return;
    }

    let container_type = if rest[0] == "*" {
        FieldType::Array
    } else {
        FieldType::Object
    };

    if node.child(child_name).is_none() {
        debug!("Creating intermediate {} node {}", container_type, child_name);
        node.children.push(SchemaNode::new(child_name, container_type));
    }
    if let Some(child) = node.child_mut(child_name) {
        if child.children.is_empty() {
            child.node_type = container_type;
        }
        insert(child, rest, descriptor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, RuleParser};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn descriptor(field: &str, rules: &str) -> FieldDescriptor {
        RuleParser::new()
            .parse(field, &[Rule::from(rules)])
            .unwrap()
    }

    #[test]
    fn test_from_descriptor() {
        let node = SchemaBuilder::from_descriptor(&descriptor("name", "required|string|max:255"));
        assert_eq!(node.node_type, FieldType::String);
        assert!(node.required);
        assert_eq!(node.max, Some(255.0));
        assert_eq!(
            node.description.as_deref(),
            Some("The name field is required. The name must be a string. The name must not be greater than 255 characters.")
        );
    }

    #[test]
    fn test_description_collapses_whitespace() {
        let mut d = FieldDescriptor::new("note");
        d.messages = vec!["  Free   text. ".to_string(), "\tShort.".to_string()];
        let node = SchemaBuilder::from_descriptor(&d);
        assert_eq!(node.description.as_deref(), Some("Free text. Short."));
    }

    #[test]
    fn test_rules_without_messages_describe_themselves() {
        let node = SchemaBuilder::from_descriptor(&descriptor("note", "nullable|sometimes"));
        assert_eq!(node.description.as_deref(), Some("Validated by: nullable, sometimes."));

        let node = SchemaBuilder::from_descriptor(&FieldDescriptor::new("bare"));
        assert_eq!(node.description, None);
    }

    #[test]
    fn test_from_descriptors_nests_paths() {
        let descriptors = vec![
            descriptor("title", "required|string"),
            descriptor("tags", "array"),
            descriptor("tags.*", "string|max:20"),
            descriptor("address.city", "required|string"),
            descriptor("address.zip", "digits:5"),
            descriptor("items.*.sku", "required|string"),
        ];
        let root = SchemaBuilder::from_descriptors("body", &descriptors);

        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "tags", "address", "items"]);

        let tags = root.child("tags").unwrap();
        assert_eq!(tags.node_type, FieldType::Array);
        assert_eq!(tags.items().unwrap().max, Some(20.0));

        let address = root.child("address").unwrap();
        assert_eq!(address.node_type, FieldType::Object);
        assert!(address.child("city").unwrap().required);

        let sku = root.child("items").unwrap().items().unwrap().child("sku").unwrap();
        assert!(sku.required);
    }

    #[test]
    fn test_intermediate_descriptor_merges_into_created_node() {
        let descriptors = vec![
            descriptor("address.city", "string"),
            descriptor("address", "required"),
        ];
        let root = SchemaBuilder::from_descriptors("body", &descriptors);
        assert_eq!(root.children.len(), 1);

        let address = root.child("address").unwrap();
        assert_eq!(address.node_type, FieldType::Object);
        assert!(address.required);
        assert_eq!(address.children.len(), 1);
    }

    #[test]
    fn test_from_value() {
        let value = json!({"id": 1, "name": "Ada", "score": 9.5, "active": true, "roles": ["admin"]});
        let node = SchemaBuilder::from_value("user", &value).unwrap();

        assert_eq!(node.node_type, FieldType::Object);
        assert_eq!(node.child("id").unwrap().node_type, FieldType::Integer);
        assert_eq!(node.child("score").unwrap().node_type, FieldType::Number);
        assert_eq!(node.child("name").unwrap().example, Some(json!("Ada")));
        let roles = node.child("roles").unwrap();
        assert_eq!(roles.items().unwrap().node_type, FieldType::String);
    }

    #[test]
    fn test_from_value_errors() {
        let err = SchemaBuilder::from_value("user", &json!({"deleted_at": null})).unwrap_err();
        match err {
            Error::UnsupportedValueType { name, value_type } => {
                assert_eq!(name, "deleted_at");
                assert_eq!(value_type, "null");
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = SchemaBuilder::from_value("tags", &json!([])).unwrap_err();
        assert!(matches!(err, Error::EmptySequenceUnsupported { name } if name == "tags"));
    }

    #[test]
    fn test_to_schema() {
        let descriptors = vec![
            descriptor("email", "required|email"),
            descriptor("age", "integer|between:18,99"),
            descriptor("avatar", "image"),
            descriptor("tags", "array|max:3"),
        ];
        let schema = SchemaBuilder::from_descriptors("body", &descriptors).to_schema();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["email"]));
        assert_eq!(value["properties"]["email"]["format"], "email");
        assert_eq!(value["properties"]["age"]["minimum"], json!(18));
        assert_eq!(value["properties"]["age"]["maximum"], json!(99));
        assert_eq!(value["properties"]["avatar"]["type"], "string");
        assert_eq!(value["properties"]["avatar"]["format"], "binary");
        assert_eq!(value["properties"]["tags"]["maxItems"], json!(3));
        assert_eq!(value["properties"]["tags"]["items"], json!({}));
    }

    #[test]
    fn test_string_bounds_map_to_length() {
        let schema = SchemaBuilder::from_descriptor(&descriptor("name", "string|between:2,5.5")).to_schema();
        assert_eq!(schema.min_length, Some(json!(2)));
        assert_eq!(schema.max_length, Some(json!(5.5)));
    }
}
