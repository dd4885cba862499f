//! Fills the gaps rules leave in a descriptor.

use crate::rules::{FieldDescriptor, FieldType};
use serde_json::{json, Value};

const STRING_FILLER: &str = "example";
const DEFAULT_EXTENSION: &str = "txt";
/// Longest string example padded up to a `min` bound
const MAX_PADDED_LENGTH: f64 = 255.0;

/// Synthesize an example for a descriptor that has none.
///
/// Only `example` is filled; an example set by a rule is kept. Applying
/// `enrich` twice gives the same descriptor as applying it once.
pub fn enrich(mut descriptor: FieldDescriptor) -> FieldDescriptor {
    if descriptor.example.is_none() {
        descriptor.example = Some(example_for(&descriptor));
    }
    descriptor
}

fn example_for(descriptor: &FieldDescriptor) -> Value {
    if let Some(first) = descriptor.enum_values.as_ref().and_then(|values| values.first()) {
        return first.clone();
    }

    match descriptor.effective_type() {
        FieldType::String => Value::String(string_example(descriptor)),
        FieldType::Integer => json!(integer_example(descriptor)),
        FieldType::Number => number_example(descriptor),
        FieldType::Boolean => Value::Bool(true),
        FieldType::Array => json!([]),
        FieldType::Object => json!({}),
        FieldType::File => {
            let extension = descriptor
                .file_extensions
                .first()
                .map(String::as_str)
                .unwrap_or(DEFAULT_EXTENSION);
            Value::String(format!("file.{}", extension))
        }
    }
}

fn string_example(descriptor: &FieldDescriptor) -> String {
    let body: String = if descriptor.valid_characters.is_empty() {
        STRING_FILLER.to_string()
    } else {
        descriptor
            .valid_characters
            .iter()
            .take(STRING_FILLER.len())
            .collect()
    };

    let mut example = String::new();
    if let Some(prefix) = &descriptor.starts_with {
        example.push_str(prefix);
    }
    example.push_str(&body);
    for c in &descriptor.required_characters {
        if !example.contains(*c) {
            example.push(*c);
        }
    }
    if let Some(suffix) = &descriptor.ends_with {
        example.push_str(suffix);
    }

    let len = example.chars().count();
    let padded_min = descriptor
        .min
        .filter(|min| *min > len as f64 && *min <= MAX_PADDED_LENGTH);
    if let Some(min) = padded_min {
        let pad = body.chars().last().unwrap_or('x');
        let missing = min.ceil() as usize - len;
        let insert_at = example.len() - descriptor.ends_with.as_deref().map_or(0, str::len);
        example.insert_str(insert_at, &pad.to_string().repeat(missing));
    }
    if let Some(max) = descriptor.max.filter(|max| max.is_finite() && *max >= 0.0) {
        example = example.chars().take(max.floor() as usize).collect();
    }

    example
}

fn integer_example(descriptor: &FieldDescriptor) -> i64 {
    let in_range = |bound: &f64| bound.is_finite() && bound.abs() < i64::MAX as f64;
    match (descriptor.min.filter(in_range), descriptor.max.filter(in_range)) {
        (Some(min), _) => min.ceil() as i64,
        (None, Some(max)) => max.floor() as i64,
        (None, None) => 1,
    }
}

fn number_example(descriptor: &FieldDescriptor) -> Value {
    let value = descriptor
        .min
        .or(descriptor.max)
        .filter(|value| value.is_finite())
        .unwrap_or(1.0);
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}
