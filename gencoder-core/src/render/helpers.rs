//! Built-in template helpers
//!
//! All helpers are prefixed with `_` to stay clear of user data names. String
//! helpers pass null or non-string input through unchanged.

use handlebars::{handlebars_helper, Handlebars, RenderError};
use regex::Regex;
use serde_json::Value;

handlebars_helper!(replace_all_helper: |target: Json, old: Json, new: Json| {
    match (target.as_str(), old.as_str(), new.as_str()) {
        (Some(target), Some(old), Some(new)) => Value::String(target.replace(old, new)),
        _ => target.clone(),
    }
});

handlebars_helper!(match_helper: |pattern: Json, target: Json| {
    match (pattern.as_str(), target.as_str()) {
        (Some(pattern), Some(target)) => match Regex::new(pattern) {
            Ok(re) => re.is_match(target),
            Err(e) => {
                return Err(RenderError::new(format!("_match: invalid pattern '{}': {}", pattern, e)));
            }
        },
        _ => false,
    }
});

handlebars_helper!(eq_helper: |left: Json, right: Json| left == right);

handlebars_helper!(ne_helper: |left: Json, right: Json| left != right);

handlebars_helper!(snake_case_helper: |s: Json| map_str(s, to_snake_case));

handlebars_helper!(camel_case_helper: |s: Json| map_str(s, to_camel_case));

handlebars_helper!(pascal_case_helper: |s: Json| map_str(s, to_pascal_case));

handlebars_helper!(upper_first_helper: |s: Json| map_str(s, upper_first));

handlebars_helper!(lower_first_helper: |s: Json| map_str(s, lower_first));

handlebars_helper!(uppercase_helper: |s: Json| map_str(s, |s| s.to_uppercase()));

handlebars_helper!(lowercase_helper: |s: Json| map_str(s, |s| s.to_lowercase()));

handlebars_helper!(trim_helper: |s: Json| map_str(s, |s| s.trim().to_string()));

handlebars_helper!(remove_prefix_helper: |s: Json, prefix: Json| {
    match (s.as_str(), prefix.as_str()) {
        (Some(s), Some(prefix)) => Value::String(s.strip_prefix(prefix).unwrap_or(s).to_string()),
        _ => s.clone(),
    }
});

handlebars_helper!(remove_suffix_helper: |s: Json, suffix: Json| {
    match (s.as_str(), suffix.as_str()) {
        (Some(s), Some(suffix)) => Value::String(s.strip_suffix(suffix).unwrap_or(s).to_string()),
        _ => s.clone(),
    }
});

/// Register every built-in helper, overwriting any helper with the same name
pub fn register_builtin_helpers(registry: &mut Handlebars<'static>) {
    registry.register_helper("_replaceAll", Box::new(replace_all_helper));
    registry.register_helper("_match", Box::new(match_helper));
    registry.register_helper("_eq", Box::new(eq_helper));
    registry.register_helper("_ne", Box::new(ne_helper));
    registry.register_helper("_snakeCase", Box::new(snake_case_helper));
    registry.register_helper("_camelCase", Box::new(camel_case_helper));
    registry.register_helper("_pascalCase", Box::new(pascal_case_helper));
    registry.register_helper("_upperFirst", Box::new(upper_first_helper));
    registry.register_helper("_lowerFirst", Box::new(lower_first_helper));
    registry.register_helper("_uppercase", Box::new(uppercase_helper));
    registry.register_helper("_lowercase", Box::new(lowercase_helper));
    registry.register_helper("_trim", Box::new(trim_helper));
    registry.register_helper("_removePrefix", Box::new(remove_prefix_helper));
    registry.register_helper("_removeSuffix", Box::new(remove_suffix_helper));
}

fn map_str(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value.as_str() {
        Some(s) => Value::String(f(s)),
        None => value.clone(),
    }
}

/// `userName` / `UserName` -> `user_name`
pub fn to_snake_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 4);
    let mut prev_lower = false;
    for ch in input.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            result.push('_');
        }
        prev_lower = ch.is_ascii_lowercase();
        result.extend(ch.to_lowercase());
    }
    result
}

/// `user_name` / `user-name` -> `userName`
pub fn to_camel_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' || ch == '-' {
            if let Some(next) = chars.peek().copied().filter(|c| c.is_ascii_alphabetic()) {
                result.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        result.push(ch);
    }
    result
}

/// `user_name` / `userName` -> `UserName`
pub fn to_pascal_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut upper_next = true;
    for ch in input.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            result.extend(ch.to_uppercase());
        } else {
            result.push(ch);
        }
        upper_next = false;
    }
    result
}

pub fn upper_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn lower_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
