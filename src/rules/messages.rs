//! Human-readable descriptions of validation rules.
//!
//! Templates use the placeholders `:attribute`, `:min`, `:max`, `:size`,
//! `:value`, `:values`, `:date`, `:format`, `:other` and `:digits`.

use super::descriptor::FieldType;
use std::collections::HashMap;

/// Rules whose phrasing depends on the type of the field
pub const SIZE_RULES: &[&str] = &["size", "between", "min", "max", "gt", "lt", "gte", "lte"];

/// Caller-supplied message overrides keyed by field and rule name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomMessages {
    messages: HashMap<(String, String), String>,
}

impl CustomMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override for `rule` on `field`
    pub fn insert(&mut self, field: &str, rule: &str, message: &str) {
        self.messages
            .insert((field.to_string(), rule.to_string()), message.to_string());
    }

    /// Register an override from a `field.rule` key
    pub fn insert_dotted(&mut self, key: &str, message: &str) -> bool {
        match key.rsplit_once('.') {
            Some((field, rule)) if !field.is_empty() && !rule.is_empty() => {
                self.insert(field, rule, message);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, field: &str, rule: &str) -> Option<&str> {
        self.messages
            .get(&(field.to_string(), rule.to_string()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Which phrasing a size rule uses for a field type
fn size_variant(field_type: Option<FieldType>) -> &'static str {
    match field_type {
        Some(FieldType::Integer) | Some(FieldType::Number) => "numeric",
        Some(FieldType::Array) => "array",
        Some(FieldType::File) => "file",
        _ => "string",
    }
}

fn size_template(rule: &str, variant: &str) -> Option<&'static str> {
    let template = match (rule, variant) {
        ("between", "numeric") => "The :attribute must be between :min and :max.",
        ("between", "file") => "The :attribute must be between :min and :max kilobytes.",
        ("between", "array") => "The :attribute must have between :min and :max items.",
        ("between", _) => "The :attribute must be between :min and :max characters.",
        ("gt", "numeric") => "The :attribute must be greater than :value.",
        ("gt", "file") => "The :attribute must be greater than :value kilobytes.",
        ("gt", "array") => "The :attribute must have more than :value items.",
        ("gt", _) => "The :attribute must be greater than :value characters.",
        ("gte", "numeric") => "The :attribute must be greater than or equal to :value.",
        ("gte", "file") => "The :attribute must be greater than or equal to :value kilobytes.",
        ("gte", "array") => "The :attribute must have :value items or more.",
        ("gte", _) => "The :attribute must be greater than or equal to :value characters.",
        ("lt", "numeric") => "The :attribute must be less than :value.",
        ("lt", "file") => "The :attribute must be less than :value kilobytes.",
        ("lt", "array") => "The :attribute must have less than :value items.",
        ("lt", _) => "The :attribute must be less than :value characters.",
        ("lte", "numeric") => "The :attribute must be less than or equal to :value.",
        ("lte", "file") => "The :attribute must be less than or equal to :value kilobytes.",
        ("lte", "array") => "The :attribute must not have more than :value items.",
        ("lte", _) => "The :attribute must be less than or equal to :value characters.",
        ("max", "numeric") => "The :attribute must not be greater than :max.",
        ("max", "file") => "The :attribute must not be greater than :max kilobytes.",
        ("max", "array") => "The :attribute must not have more than :max items.",
        ("max", _) => "The :attribute must not be greater than :max characters.",
        ("min", "numeric") => "The :attribute must be at least :min.",
        ("min", "file") => "The :attribute must be at least :min kilobytes.",
        ("min", "array") => "The :attribute must have at least :min items.",
        ("min", _) => "The :attribute must be at least :min characters.",
        ("size", "numeric") => "The :attribute must be :size.",
        ("size", "file") => "The :attribute must be :size kilobytes.",
        ("size", "array") => "The :attribute must contain :size items.",
        ("size", _) => "The :attribute must be :size characters.",
        _ => return None,
    };
    Some(template)
}

fn template(rule: &str) -> Option<&'static str> {
    let template = match rule {
        "accepted" => "The :attribute must be accepted.",
        "accepted_if" => "The :attribute must be accepted when :other is :value.",
        "active_url" => "The :attribute is not a valid URL.",
        "after" => "The :attribute must be a date after :date.",
        "after_or_equal" => "The :attribute must be a date after or equal to :date.",
        "alpha" => "The :attribute must only contain letters.",
        "alpha_dash" => "The :attribute must only contain letters, numbers, dashes and underscores.",
        "alpha_num" => "The :attribute must only contain letters and numbers.",
        "array" => "The :attribute must be an array.",
        "before" => "The :attribute must be a date before :date.",
        "before_or_equal" => "The :attribute must be a date before or equal to :date.",
        "boolean" => "The :attribute field must be true or false.",
        "confirmed" => "The :attribute confirmation does not match.",
        "date" => "The :attribute is not a valid date.",
        "date_equals" => "The :attribute must be a date equal to :date.",
        "date_format" => "The :attribute does not match the format :format.",
        "declined" => "The :attribute must be declined.",
        "different" => "The :attribute and :other must be different.",
        "digits" => "The :attribute must be :digits digits.",
        "digits_between" => "The :attribute must be between :min and :max digits.",
        "dimensions" => "The :attribute has invalid image dimensions.",
        "distinct" => "The :attribute field has a duplicate value.",
        "email" => "The :attribute must be a valid email address.",
        "ends_with" => "The :attribute must end with one of the following: :values.",
        "exists" => "The selected :attribute is invalid.",
        "file" => "The :attribute must be a file.",
        "filled" => "The :attribute field must have a value.",
        "image" => "The :attribute must be an image.",
        "in" => "The selected :attribute is invalid.",
        "in_array" => "The :attribute field does not exist in :other.",
        "integer" => "The :attribute must be an integer.",
        "ip" => "The :attribute must be a valid IP address.",
        "ipv4" => "The :attribute must be a valid IPv4 address.",
        "ipv6" => "The :attribute must be a valid IPv6 address.",
        "json" => "The :attribute must be a valid JSON string.",
        "mimes" => "The :attribute must be a file of type: :values.",
        "mimetypes" => "The :attribute must be a file of type: :values.",
        "multiple_of" => "The :attribute must be a multiple of :value.",
        "not_in" => "The selected :attribute is invalid.",
        "not_regex" => "The :attribute format is invalid.",
        "numeric" => "The :attribute must be a number.",
        "present" => "The :attribute field must be present.",
        "prohibited" => "The :attribute field is prohibited.",
        "regex" => "The :attribute format is invalid.",
        "required" => "The :attribute field is required.",
        "required_if" => "The :attribute field is required when :other is :value.",
        "required_unless" => "The :attribute field is required unless :other is in :values.",
        "required_with" => "The :attribute field is required when :values is present.",
        "required_with_all" => "The :attribute field is required when :values are present.",
        "required_without" => "The :attribute field is required when :values is not present.",
        "required_without_all" => {
            "The :attribute field is required when none of :values are present."
        }
        "same" => "The :attribute and :other must match.",
        "starts_with" => "The :attribute must start with one of the following: :values.",
        "string" => "The :attribute must be a string.",
        "timezone" => "The :attribute must be a valid timezone.",
        "unique" => "The :attribute has already been taken.",
        "url" => "The :attribute must be a valid URL.",
        "uuid" => "The :attribute must be a valid UUID.",
        _ => return None,
    };
    Some(template)
}

/// Attribute name as shown in messages: `first_name` reads `first name`
pub fn displayable_attribute(name: &str) -> String {
    name.replace('_', " ")
}

/// Build the message for one processed rule.
///
/// A custom override for `(field, rule)` wins; size rules pick their phrasing
/// from `field_type`; rules without a template produce no message.
pub fn message_for(
    field: &str,
    rule: &str,
    params: &[String],
    field_type: Option<FieldType>,
    custom: &CustomMessages,
) -> Option<String> {
    let raw = match custom.get(field, rule) {
        Some(message) => message.to_string(),
        None if SIZE_RULES.contains(&rule) => {
            size_template(rule, size_variant(field_type))?.to_string()
        }
        None => template(rule)?.to_string(),
    };

    Some(make_replacements(&raw, field, rule, params))
}

fn make_replacements(message: &str, field: &str, rule: &str, params: &[String]) -> String {
    let first = params.first().cloned().unwrap_or_default();
    let second = params.get(1).cloned().unwrap_or_default();
    let all = params.join(", ");
    let rest = params.iter().skip(1).cloned().collect::<Vec<_>>().join(", ");

    let mut replacements: Vec<(&str, String)> = Vec::new();
    match rule {
        "between" | "digits_between" => {
            replacements.push((":min", first));
            replacements.push((":max", second));
        }
        "min" => replacements.push((":min", first)),
        "max" => replacements.push((":max", first)),
        "size" => replacements.push((":size", first)),
        "digits" => replacements.push((":digits", first)),
        "gt" | "gte" | "lt" | "lte" | "multiple_of" => replacements.push((":value", first)),
        "after" | "after_or_equal" | "before" | "before_or_equal" | "date_equals" => {
            replacements.push((":date", first))
        }
        "date_format" => replacements.push((":format", first)),
        "different" | "same" | "in_array" => {
            replacements.push((":other", displayable_attribute(&first)))
        }
        "required_if" | "accepted_if" => {
            replacements.push((":other", displayable_attribute(&first)));
            replacements.push((":value", second));
        }
        "required_unless" => {
            replacements.push((":other", displayable_attribute(&first)));
            replacements.push((":values", rest));
        }
        _ => replacements.push((":values", all)),
    }
    replacements.push((":attribute", displayable_attribute(field)));

    // `:values` must be replaced before `:value`
    replacements.sort_by_key(|(placeholder, _)| std::cmp::Reverse(placeholder.len()));

    replacements
        .into_iter()
        .fold(message.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, &value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_required_message() {
        let msg = message_for("first_name", "required", &[], None, &CustomMessages::new());
        assert_eq!(msg.as_deref(), Some("The first name field is required."));
    }

    #[test]
    fn test_size_rule_defaults_to_string_phrasing() {
        let msg = message_for("name", "max", &params(&["255"]), None, &CustomMessages::new());
        assert_eq!(
            msg.as_deref(),
            Some("The name must not be greater than 255 characters.")
        );
    }

    #[test]
    fn test_size_rule_numeric_and_array_phrasing() {
        let custom = CustomMessages::new();
        let numeric = message_for("age", "min", &params(&["18"]), Some(FieldType::Integer), &custom);
        assert_eq!(numeric.as_deref(), Some("The age must be at least 18."));

        let array = message_for("tags", "between", &params(&["1", "3"]), Some(FieldType::Array), &custom);
        assert_eq!(array.as_deref(), Some("The tags must have between 1 and 3 items."));

        let file = message_for("avatar", "size", &params(&["512"]), Some(FieldType::File), &custom);
        assert_eq!(file.as_deref(), Some("The avatar must be 512 kilobytes."));
    }

    #[test]
    fn test_values_replaced_before_value() {
        let msg = message_for(
            "role",
            "required_unless",
            &params(&["account_type", "admin", "owner"]),
            None,
            &CustomMessages::new(),
        );
        assert_eq!(
            msg.as_deref(),
            Some("The role field is required unless account type is in admin, owner.")
        );
    }

    #[test]
    fn test_custom_message_override() {
        let mut custom = CustomMessages::new();
        assert!(custom.insert_dotted("address.city.required", "We need your :attribute."));

        let msg = message_for("address.city", "required", &[], None, &custom);
        assert_eq!(msg.as_deref(), Some("We need your address.city."));

        let other = message_for("address.zip", "required", &[], None, &custom);
        assert_eq!(other.as_deref(), Some("The address.zip field is required."));
    }

    #[test]
    fn test_rules_without_template() {
        assert!(message_for("x", "nullable", &[], None, &CustomMessages::new()).is_none());
        assert!(message_for("x", "bail", &[], None, &CustomMessages::new()).is_none());
    }

    #[test]
    fn test_insert_dotted_rejects_keys_without_rule() {
        let mut custom = CustomMessages::new();
        assert!(!custom.insert_dotted("email", "Nope"));
        assert!(custom.is_empty());
    }
}
