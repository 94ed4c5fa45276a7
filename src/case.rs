//! Identifier casing between the two sides of the service: tables and columns are snake_case,
//! request and response JSON is camelCase.

use serde_json::{Map, Value};

/// `email_updates` -> `emailUpdates`. Names already in camelCase pass through.
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Maps a `sort` query parameter such as `averageRating` onto its column, `average_rating`.
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrite every key of a response payload to camelCase, descending into the relation
/// objects and arrays that nested reads embed, since `row_to_json` keeps column names as-is.
pub fn value_keys_to_camel_case_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let entries = std::mem::take(map);
            *map = entries
                .into_iter()
                .map(|(k, mut v)| {
                    value_keys_to_camel_case_recursive(&mut v);
                    (to_camel_case(&k), v)
                })
                .collect::<Map<String, Value>>();
        }
        Value::Array(items) => items.iter_mut().for_each(value_keys_to_camel_case_recursive),
        _ => {}
    }
}
