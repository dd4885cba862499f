//! The closed table of rule keywords the parser understands.

use super::dates;
use super::descriptor::{FieldDescriptor, FieldType};
use log::debug;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Handler that folds one rule into a descriptor
pub type ApplyFn = fn(&mut FieldDescriptor, &[String]);

/// One known rule keyword.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub name: &'static str,
    /// Minimum number of parameters the rule needs
    pub arity: usize,
    pub apply: ApplyFn,
}

const fn rule(name: &'static str, arity: usize, apply: ApplyFn) -> RuleSpec {
    RuleSpec { name, arity, apply }
}

pub const RULES: &[RuleSpec] = &[
    rule("accepted", 0, accepted),
    rule("accepted_if", 2, accepted_if),
    rule("active_url", 0, url),
    rule("after", 1, after),
    rule("after_or_equal", 1, same_day),
    rule("alpha", 0, alpha),
    rule("alpha_dash", 0, alpha_dash),
    rule("alpha_num", 0, alpha_num),
    rule("array", 0, array),
    rule("bail", 0, no_effect),
    rule("before", 1, before),
    rule("before_or_equal", 1, same_day),
    rule("between", 2, between),
    rule("boolean", 0, boolean),
    rule("confirmed", 0, no_effect),
    rule("date", 0, string),
    rule("date_equals", 1, same_day),
    rule("date_format", 1, date_format),
    rule("declined", 0, declined),
    rule("different", 1, no_effect),
    rule("digits", 1, digits),
    rule("digits_between", 2, digits_between),
    rule("dimensions", 0, file),
    rule("distinct", 0, no_effect),
    rule("email", 0, email),
    rule("ends_with", 1, ends_with),
    rule("exclude", 0, no_effect),
    rule("exists", 1, no_effect),
    rule("file", 0, file),
    rule("filled", 0, filled),
    rule("gt", 1, lower_bound),
    rule("gte", 1, lower_bound),
    rule("image", 0, image),
    rule("in", 1, in_list),
    rule("in_array", 1, no_effect),
    rule("integer", 0, integer),
    rule("ip", 0, ipv4),
    rule("ipv4", 0, ipv4),
    rule("ipv6", 0, ipv6),
    rule("json", 0, json_string),
    rule("lt", 1, upper_bound),
    rule("lte", 1, upper_bound),
    rule("max", 1, max),
    rule("mimes", 1, mimes),
    rule("mimetypes", 1, file),
    rule("min", 1, min),
    rule("multiple_of", 1, no_effect),
    rule("not_in", 1, no_effect),
    rule("not_regex", 1, no_effect),
    rule("nullable", 0, no_effect),
    rule("numeric", 0, numeric),
    rule("present", 0, required),
    rule("prohibited", 0, no_effect),
    rule("regex", 1, regex),
    rule("required", 0, required),
    rule("required_if", 2, required),
    rule("required_unless", 2, required),
    rule("required_with", 1, required),
    rule("required_with_all", 1, required),
    rule("required_without", 1, required),
    rule("required_without_all", 1, required),
    rule("same", 1, no_effect),
    rule("size", 1, size),
    rule("sometimes", 0, no_effect),
    rule("starts_with", 1, starts_with),
    rule("string", 0, string),
    rule("timezone", 0, timezone),
    rule("unique", 1, no_effect),
    rule("url", 0, url),
    rule("uuid", 0, uuid),
];

/// Look up a rule by its snake_case keyword
pub fn lookup(name: &str) -> Option<&'static RuleSpec> {
    static INDEX: OnceLock<HashMap<&'static str, &'static RuleSpec>> = OnceLock::new();

    INDEX
        .get_or_init(|| RULES.iter().map(|spec| (spec.name, spec)).collect())
        .get(name)
        .copied()
}

fn no_effect(_: &mut FieldDescriptor, _: &[String]) {}

fn required(d: &mut FieldDescriptor, _: &[String]) {
    d.mark_required();
}

fn string(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::String);
}

fn integer(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::Integer);
}

fn numeric(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::Number);
}

fn array(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::Array);
}

fn file(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::File);
}

fn accepted(d: &mut FieldDescriptor, params: &[String]) {
    d.mark_required();
    accepted_if(d, params);
}

fn accepted_if(d: &mut FieldDescriptor, _: &[String]) {
    d.add_enum([
        json!("yes"),
        json!("on"),
        json!("1"),
        json!(1),
        json!(true),
        json!("true"),
    ]);
}

fn declined(d: &mut FieldDescriptor, _: &[String]) {
    d.add_enum([
        json!("no"),
        json!("off"),
        json!("0"),
        json!(0),
        json!(false),
        json!("false"),
    ]);
}

fn boolean(d: &mut FieldDescriptor, _: &[String]) {
    d.add_enum([json!(true), json!(false), json!(0), json!(1), json!("0"), json!("1")])
        .set_type(FieldType::Boolean);
}

fn alphabet() -> impl Iterator<Item = char> {
    ('a'..='z').chain('A'..='Z')
}

fn alpha(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::String).add_valid_characters(alphabet());
}

fn alpha_num(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::String)
        .add_valid_characters(alphabet().chain('0'..='9'));
}

fn alpha_dash(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::String)
        .add_valid_characters(alphabet().chain('0'..='9').chain(['_', '-']));
}

fn string_with(d: &mut FieldDescriptor, format: Option<&str>, example: Value) {
    d.set_type(FieldType::String).set_example(example);
    if let Some(format) = format {
        d.format = Some(format.to_string());
    }
}

fn email(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, Some("email"), json!("user@example.com"));
}

fn url(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, Some("uri"), json!("https://example.com"));
}

fn uuid(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, Some("uuid"), json!("0f8fad5b-d9cb-469f-a165-70867728950e"));
}

fn ipv4(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, Some("ipv4"), json!("192.168.0.1"));
}

fn ipv6(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, Some("ipv6"), json!("2001:db8::1"));
}

fn timezone(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, None, json!("Europe/Paris"));
}

fn json_string(d: &mut FieldDescriptor, _: &[String]) {
    string_with(d, None, json!(r#"{"name":"John Doe"}"#));
}

fn date_relative(d: &mut FieldDescriptor, reference: &str, offset_days: i64) {
    d.set_type(FieldType::String);
    match dates::parse_reference(reference) {
        Some(date) => match date.checked_add_signed(chrono::Duration::days(offset_days)) {
            Some(example) => {
                d.set_example(Value::String(dates::render(&example)));
            }
            None => debug!(
                "Date reference '{}' on field {} leaves the supported range, no example",
                reference, d.name
            ),
        },
        None => debug!(
            "Date reference '{}' on field {} is not a date, no example",
            reference, d.name
        ),
    }
}

fn after(d: &mut FieldDescriptor, params: &[String]) {
    date_relative(d, &params[0], 1);
}

fn before(d: &mut FieldDescriptor, params: &[String]) {
    date_relative(d, &params[0], -1);
}

fn same_day(d: &mut FieldDescriptor, params: &[String]) {
    date_relative(d, &params[0], 0);
}

fn date_format(d: &mut FieldDescriptor, params: &[String]) {
    d.set_type(FieldType::String);
    if let Some(example) = dates::now_in_php_format(&params[0]) {
        d.set_example(Value::String(example));
    }
}

/// A finite numeric bound; `inf` and `NaN` parse as floats but are not bounds
fn finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

fn number_param(d: &FieldDescriptor, raw: &str) -> Option<f64> {
    let parsed = finite(raw);
    if parsed.is_none() {
        debug!("Bound '{}' on field {} is not a finite number, ignored", raw, d.name);
    }
    parsed
}

fn min(d: &mut FieldDescriptor, params: &[String]) {
    if let Some(value) = number_param(d, &params[0]) {
        d.min = Some(value);
    }
}

fn max(d: &mut FieldDescriptor, params: &[String]) {
    if let Some(value) = number_param(d, &params[0]) {
        d.max = Some(value);
    }
}

fn between(d: &mut FieldDescriptor, params: &[String]) {
    min(d, &params[..1]);
    max(d, &params[1..]);
}

fn size(d: &mut FieldDescriptor, params: &[String]) {
    min(d, params);
    max(d, params);
}

fn filled(d: &mut FieldDescriptor, _: &[String]) {
    if !d.min.is_some_and(|min| min > 0.0) {
        d.min = Some(1.0);
    }
}

// `gt:other_field` compares against another field: nothing to document
fn lower_bound(d: &mut FieldDescriptor, params: &[String]) {
    if let Some(value) = finite(&params[0]) {
        d.min = Some(value);
    }
}

fn upper_bound(d: &mut FieldDescriptor, params: &[String]) {
    if let Some(value) = finite(&params[0]) {
        d.max = Some(value);
    }
}

fn digits(d: &mut FieldDescriptor, params: &[String]) {
    d.set_type(FieldType::Number);
    d.pattern = Some(format!(r"^\d{{{}}}$", params[0].trim()));
}

fn digits_between(d: &mut FieldDescriptor, params: &[String]) {
    d.set_type(FieldType::Number);
    d.pattern = Some(format!(
        r"^\d{{{},{}}}$",
        params[0].trim(),
        params[1].trim()
    ));
}

fn in_list(d: &mut FieldDescriptor, params: &[String]) {
    d.add_enum(params.iter().map(|p| Value::String(p.clone())));
}

fn starts_with(d: &mut FieldDescriptor, params: &[String]) {
    d.starts_with = Some(params[0].clone());
}

fn ends_with(d: &mut FieldDescriptor, params: &[String]) {
    d.ends_with = Some(params[0].clone());
}

fn image(d: &mut FieldDescriptor, _: &[String]) {
    d.set_type(FieldType::File)
        .add_file_extensions(["jpeg", "png", "gif", "bmp", "svg"]);
}

fn mimes(d: &mut FieldDescriptor, params: &[String]) {
    d.set_type(FieldType::File)
        .add_file_extensions(params.iter().map(|p| p.trim().to_string()));
}

fn regex(d: &mut FieldDescriptor, params: &[String]) {
    d.pattern = Some(strip_delimiters(&params[0]));
}

/// `/^[a-z]+$/i` -> `^[a-z]+$`
fn strip_delimiters(raw: &str) -> String {
    let raw = raw.trim();
    let mut chars = raw.chars();
    let Some(delimiter) = chars.next() else {
        return String::new();
    };
    if delimiter.is_alphanumeric() || delimiter == '\\' || delimiter.is_whitespace() {
        return raw.to_string();
    }

    let closing = match delimiter {
        '(' => ')',
        '{' => '}',
        '[' => ']',
        '<' => '>',
        other => other,
    };
    let body = &raw[delimiter.len_utf8()..];
    match body.rfind(closing) {
        Some(end) => body[..end].to_string(),
        None => raw.to_string(),
    }
}
