//! Validation rules and their interpretation as field descriptors.
//!
//! A field's rules arrive as a list mixing plain tokens (`"max:255"`,
//! `"required|string"`), structured `(name, params)` pairs and rule objects.
//! [`RuleParser`] folds them, in order, into a [`FieldDescriptor`].

pub mod dates;
pub mod descriptor;
pub mod messages;
pub mod registry;

pub use descriptor::{FieldDescriptor, FieldType};
pub use messages::CustomMessages;

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// A rule object that can describe itself to the generator.
pub trait ParsableRule {
    /// Apply this rule's constraint to the descriptor
    fn parse(&self, descriptor: &mut FieldDescriptor);
}

/// A custom rule type supplied by the application.
pub trait RuleObject: fmt::Debug + Send + Sync {
    fn name(&self) -> String;

    /// The parse capability, for rule objects that have one
    fn as_parsable(&self) -> Option<&dyn ParsableRule> {
        None
    }
}

/// One entry of a field's rule list.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A textual rule, possibly pipe-delimited: `required|max:255`
    Token(String),
    /// A rule already split into name and parameters
    Structured { name: String, params: Vec<String> },
    /// An application-defined rule object
    Object(Arc<dyn RuleObject>),
}

impl Rule {
    pub fn structured(name: &str, params: &[&str]) -> Self {
        Rule::Structured {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl From<&str> for Rule {
    fn from(token: &str) -> Self {
        Rule::Token(token.to_string())
    }
}

impl From<String> for Rule {
    fn from(token: String) -> Self {
        Rule::Token(token)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Rule::Token(a), Rule::Token(b)) => a == b,
            (
                Rule::Structured { name: a, params: pa },
                Rule::Structured { name: b, params: pb },
            ) => a == b && pa == pb,
            (Rule::Object(a), Rule::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A rule reduced to its keyword and parameters
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedToken {
    name: String,
    params: Vec<String>,
}

impl ParsedToken {
    fn display(&self) -> String {
        if self.params.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.params.join(","))
        }
    }
}

/// Rules whose single parameter is a regular expression that may contain
/// `|` and `,`
fn takes_pattern(name: &str) -> bool {
    matches!(name, "regex" | "not_regex")
}

/// `AlphaNum` and `alphaNum` become `alpha_num`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.trim().chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c == '-' || c == ' ' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out
}

fn split_token(segment: &str) -> ParsedToken {
    match segment.split_once(':') {
        None => ParsedToken {
            name: snake_case(segment),
            params: Vec::new(),
        },
        Some((name, rest)) => {
            let name = snake_case(name);
            let params = if takes_pattern(&name) {
                vec![rest.to_string()]
            } else if rest.trim().is_empty() {
                Vec::new()
            } else {
                rest.split(',').map(|p| p.trim().to_string()).collect()
            };
            ParsedToken { name, params }
        }
    }
}

/// Expand a pipe-delimited rule string into its tokens.
///
/// A `regex:`/`not_regex:` segment takes the rest of the string as its
/// pattern.
fn expand_token(raw: &str) -> Vec<ParsedToken> {
    let segments: Vec<&str> = raw.split('|').collect();
    let mut tokens = Vec::new();

    let mut i = 0;
    while i < segments.len() {
        let segment = segments[i].trim();
        i += 1;
        if segment.is_empty() {
            continue;
        }

        let is_pattern = segment
            .split_once(':')
            .is_some_and(|(name, _)| takes_pattern(&snake_case(name)));
        if is_pattern {
            let rest = segments[i - 1..].join("|");
            tokens.push(split_token(rest.trim()));
            break;
        }

        tokens.push(split_token(segment));
    }

    tokens
}

/// Parses the rule list of one field into a descriptor.
#[derive(Debug, Default)]
pub struct RuleParser {
    messages: CustomMessages,
}

impl RuleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use caller-supplied message overrides
    pub fn with_messages(mut self, messages: CustomMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Fold `rules` into a descriptor for `field`.
    ///
    /// Fails on an unknown keyword or on a rule given too few parameters.
    pub fn parse(&self, field: &str, rules: &[Rule]) -> Result<FieldDescriptor> {
        let mut descriptor = FieldDescriptor::new(field);

        for rule in rules {
            match rule {
                Rule::Token(raw) => {
                    for token in expand_token(raw) {
                        self.apply(&mut descriptor, &token)?;
                    }
                }
                Rule::Structured { name, params } => {
                    let token = ParsedToken {
                        name: snake_case(name),
                        params: params.clone(),
                    };
                    self.apply(&mut descriptor, &token)?;
                }
                Rule::Object(object) => self.apply_object(&mut descriptor, object.as_ref()),
            }
        }

        debug!(
            "Parsed field {} with {} rule(s)",
            field,
            descriptor.raw_rules.len() + usize::from(descriptor.required)
        );
        Ok(descriptor)
    }

    fn apply(&self, descriptor: &mut FieldDescriptor, token: &ParsedToken) -> Result<()> {
        let spec = registry::lookup(&token.name).ok_or_else(|| Error::UnknownRule {
            rule: token.name.clone(),
            field: descriptor.name.clone(),
        })?;

        if token.params.len() < spec.arity {
            return Err(Error::RuleArity {
                rule: token.name.clone(),
                field: descriptor.name.clone(),
                required: spec.arity,
            });
        }

        // Size rules are phrased after the type known before them
        let type_so_far = descriptor.field_type;
        (spec.apply)(descriptor, &token.params);

        if let Some(message) = messages::message_for(
            &descriptor.name,
            &token.name,
            &token.params,
            type_so_far,
            &self.messages,
        ) {
            descriptor.messages.push(message);
        }

        if token.name != "required" {
            descriptor.raw_rules.push(token.display());
        }

        Ok(())
    }

    fn apply_object(&self, descriptor: &mut FieldDescriptor, object: &dyn RuleObject) {
        let name = object.name();
        let Some(parsable) = object.as_parsable() else {
            warn!(
                "Rule {} on field {} cannot describe itself, documenting the field without it",
                name, descriptor.name
            );
            return;
        };

        let type_so_far = descriptor.field_type;
        parsable.parse(descriptor);

        if let Some(message) = messages::message_for(
            &descriptor.name,
            &name,
            &[],
            type_so_far,
            &self.messages,
        ) {
            descriptor.messages.push(message);
        }
        descriptor.raw_rules.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(field: &str, rules: &[&str]) -> Result<FieldDescriptor> {
        let rules: Vec<Rule> = rules.iter().map(|r| Rule::from(*r)).collect();
        RuleParser::new().parse(field, &rules)
    }

    #[derive(Debug)]
    struct Uppercase;

    impl ParsableRule for Uppercase {
        fn parse(&self, descriptor: &mut FieldDescriptor) {
            descriptor.set_type(FieldType::String);
            descriptor.pattern = Some("^[A-Z]+$".to_string());
        }
    }

    impl RuleObject for Uppercase {
        fn name(&self) -> String {
            "uppercase".to_string()
        }

        fn as_parsable(&self) -> Option<&dyn ParsableRule> {
            Some(self)
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl RuleObject for Opaque {
        fn name(&self) -> String {
            "opaque".to_string()
        }
    }

    #[test]
    fn test_required_string_max() {
        for n in [1, 42, 255] {
            let token = format!("required|string|max:{}", n);
            let d = parse("name", &[token.as_str()]).unwrap();
            assert_eq!(d.field_type, Some(FieldType::String));
            assert!(d.required);
            assert_eq!(d.max, Some(n as f64));
        }
    }

    #[test]
    fn test_scalar_last_write_wins() {
        let d = parse("name", &["max:5|max:10"]).unwrap();
        assert_eq!(d.max, Some(10.0));
    }

    #[test]
    fn test_enum_union_across_rules() {
        let d = parse("role", &["in:a,b|in:c"]).unwrap();
        assert_eq!(d.enum_values, Some(vec![json!("a"), json!("b"), json!("c")]));
    }

    #[test]
    fn test_unknown_rule() {
        let err = parse("email", &["required|frobnicate"]).unwrap_err();
        match err {
            Error::UnknownRule { rule, field } => {
                assert_eq!(rule, "frobnicate");
                assert_eq!(field, "email");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_rule_arity() {
        let err = parse("age", &["between:1"]).unwrap_err();
        match err {
            Error::RuleArity {
                rule,
                field,
                required,
            } => {
                assert_eq!(rule, "between");
                assert_eq!(field, "age");
                assert_eq!(required, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_no_effect_rules_are_known() {
        let d = parse("nickname", &["bail|sometimes|nullable|string"]).unwrap();
        assert_eq!(d.field_type, Some(FieldType::String));
        assert_eq!(d.raw_rules, vec!["bail", "sometimes", "nullable", "string"]);
    }

    #[test]
    fn test_regex_absorbs_pipes() {
        let d = parse("code", &["required|regex:/^(a|b),c$/|max:3"]).unwrap();
        assert_eq!(d.pattern.as_deref(), Some("^(a|b),c$"));
        assert_eq!(d.raw_rules, vec!["regex:/^(a|b),c$/|max:3"]);
        assert_eq!(d.max, None);
    }

    #[test]
    fn test_structured_and_camel_case_names() {
        let rules = vec![Rule::structured("AlphaNum", &[]), Rule::structured("between", &["2", "8"])];
        let d = RuleParser::new().parse("username", &rules).unwrap();
        assert_eq!(d.valid_characters.len(), 62);
        assert_eq!(d.min, Some(2.0));
        assert_eq!(d.max, Some(8.0));
        assert_eq!(d.raw_rules, vec!["alpha_num", "between:2,8"]);
    }

    #[test]
    fn test_required_is_not_a_raw_rule() {
        let d = parse("title", &["required", "string"]).unwrap();
        assert!(d.required);
        assert_eq!(d.raw_rules, vec!["string"]);
    }

    #[test]
    fn test_messages_in_rule_order() {
        let d = parse("age", &["required|integer|min:18"]).unwrap();
        assert_eq!(
            d.messages,
            vec![
                "The age field is required.",
                "The age must be an integer.",
                "The age must be at least 18.",
            ]
        );
    }

    #[test]
    fn test_custom_messages_override() {
        let mut custom = CustomMessages::new();
        custom.insert("email", "required", "Tell us where to write.");
        let parser = RuleParser::new().with_messages(custom);

        let d = parser.parse("email", &[Rule::from("required|email")]).unwrap();
        assert_eq!(d.messages[0], "Tell us where to write.");
    }

    #[test]
    fn test_parsable_rule_object() {
        let rules = vec![Rule::from("required"), Rule::Object(Arc::new(Uppercase))];
        let d = RuleParser::new().parse("code", &rules).unwrap();
        assert_eq!(d.pattern.as_deref(), Some("^[A-Z]+$"));
        assert_eq!(d.raw_rules, vec!["uppercase"]);
    }

    #[test]
    fn test_opaque_rule_object_is_skipped() {
        let rules = vec![Rule::Object(Arc::new(Opaque)), Rule::from("string")];
        let d = RuleParser::new().parse("code", &rules).unwrap();
        assert_eq!(d.field_type, Some(FieldType::String));
        assert_eq!(d.raw_rules, vec!["string"]);
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("AlphaNum"), "alpha_num");
        assert_eq!(snake_case("requiredWithAll"), "required_with_all");
        assert_eq!(snake_case("digits_between"), "digits_between");
    }

    #[test]
    fn test_date_rule_beyond_calendar_is_not_fatal() {
        let d = parse("d", &["date|after:+262142-12-31"]).unwrap();
        assert_eq!(d.field_type, Some(FieldType::String));
        assert!(d.example.is_none());
        assert_eq!(d.raw_rules, vec!["date", "after:+262142-12-31"]);
    }
}
