use serde_json::Value;

use super::{format_scalar, result_body};

/// Headline answer of each command, in lookup order.
const HEADLINE_KEYS: &[&str] = &[
    "readiness_score",
    "retirement_age",
    "required_monthly_contribution",
    "risk_level",
    "recommended_allocation",
    "needs_rebalancing",
    "passed_tests",
    "assets_under_management",
    "retirement_age_for_target",
    "projection",
    "baseline_value",
];

/// Print just the headline value, falling back to the first result field.
pub fn print_minimal(value: &Value) {
    let body = result_body(value);

    if let Value::Object(map) = body {
        for key in HEADLINE_KEYS {
            if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                println!("{}", headline(val));
                return;
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, headline(val));
            return;
        }
    }

    println!("{}", headline(body));
}

fn headline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        // Nested objects print their scalar fields on one line.
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_object() && !v.is_array())
            .map(|(k, v)| format!("{}={}", k, format_scalar(v)))
            .collect::<Vec<_>>()
            .join(" "),
        _ => format_scalar(value),
    }
}
