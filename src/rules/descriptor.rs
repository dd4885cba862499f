use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type of a validated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Object,
    Array,
    File,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::File => "file",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Number)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical summary of every rule applied to one field.
///
/// Scalar attributes are last-write-wins, set-like attributes accumulate by
/// ordered union and `required` only ever goes from `false` to `true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Dotted or wildcard path, e.g. `tags.*` or `address.city`
    pub name: String,
    /// Resolved type; `None` means callers assume a string
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub valid_characters: Vec<char>,
    pub required_characters: Vec<char>,
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub file_extensions: Vec<String>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub example: Option<Value>,
    pub messages: Vec<String>,
    pub raw_rules: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Type to assume when none was declared
    pub fn effective_type(&self) -> FieldType {
        self.field_type.unwrap_or(FieldType::String)
    }

    pub fn set_type(&mut self, field_type: FieldType) -> &mut Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn mark_required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    /// Add values to the enum, keeping first-seen order and skipping duplicates
    pub fn add_enum<I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        let current = self.enum_values.get_or_insert_with(Vec::new);
        for value in values {
            if !current.contains(&value) {
                current.push(value);
            }
        }
        self
    }

    pub fn add_valid_characters<I>(&mut self, chars: I) -> &mut Self
    where
        I: IntoIterator<Item = char>,
    {
        union_into(&mut self.valid_characters, chars);
        self
    }

    pub fn add_required_character(&mut self, character: char) -> &mut Self {
        union_into(&mut self.required_characters, [character]);
        self
    }

    pub fn add_file_extensions<I, S>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        union_into(
            &mut self.file_extensions,
            extensions.into_iter().map(Into::into),
        );
        self
    }

    pub fn set_example(&mut self, example: Value) -> &mut Self {
        self.example = Some(example);
        self
    }
}

fn union_into<T, I>(target: &mut Vec<T>, items: I)
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_union_keeps_order() {
        let mut descriptor = FieldDescriptor::new("role");
        descriptor.add_enum(vec![json!("a"), json!("b")]);
        descriptor.add_enum(vec![json!("b"), json!("c")]);

        assert_eq!(
            descriptor.enum_values,
            Some(vec![json!("a"), json!("b"), json!("c")])
        );
    }

    #[test]
    fn test_effective_type_defaults_to_string() {
        let mut descriptor = FieldDescriptor::new("name");
        assert_eq!(descriptor.effective_type(), FieldType::String);

        descriptor.set_type(FieldType::Integer);
        assert_eq!(descriptor.effective_type(), FieldType::Integer);
        assert!(descriptor.effective_type().is_numeric());
    }

    #[test]
    fn test_serializes_type_lowercase() {
        let mut descriptor = FieldDescriptor::new("avatar");
        descriptor.set_type(FieldType::File).add_file_extensions(["png", "png", "gif"]);

        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["type"], "file");
        assert_eq!(value["file_extensions"], json!(["png", "gif"]));
    }
}
