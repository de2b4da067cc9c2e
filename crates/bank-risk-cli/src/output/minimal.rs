use serde_json::Value;

use super::BatchView;

/// Headline figures, most specific first.
const PRIORITY_KEYS: [&str; 10] = [
    "expected_loss",
    "capital_requirement",
    "cet1_ratio",
    "post_stress_cet1_ratio",
    "exceptions",
    "var",
    "loss",
    "violations",
    "delta",
    "version",
];

/// Print just the key figure of the output.
///
/// Looks for the first well-known field in the result, then falls back to
/// the first field. Arrays and batches print one line per element.
pub fn print_minimal(value: &Value, batch: Option<&BatchView<'_>>) {
    if let Some(b) = batch {
        for item in b.results {
            println!("{}", headline(item));
        }
        return;
    }

    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Array(items) => {
            for item in items {
                println!("{}", headline(item));
            }
        }
        Value::Object(_) => println!("{}", headline(result_obj)),
        other => println!("{}", format_minimal(other)),
    }
}

fn headline(value: &Value) -> String {
    let Value::Object(map) = value else {
        return format_minimal(value);
    };
    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key) {
            if !val.is_null() {
                return format_minimal(val);
            }
        }
    }
    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
