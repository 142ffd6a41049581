pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use colored::Colorize;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{}: JSON serialization failed: {}", "error".red().bold(), e),
    }
}

/// The `result` body of a computation envelope, or the value itself for
/// commands that print a bare object.
pub fn result_body(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Scalar fields of a nested object as `(dotted.key, value)` rows. Arrays of
/// objects are skipped; callers print them as their own tables.
pub fn flatten(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into("", map, &mut rows);
    rows
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, rows: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => flatten_into(&name, inner, rows),
            Value::Array(items) if items.iter().any(Value::is_object) => {}
            _ => rows.push((name, format_scalar(val))),
        }
    }
}

/// Arrays of objects inside a result, keyed by their dotted path.
pub fn nested_tables(map: &Map<String, Value>) -> Vec<(String, &Vec<Value>)> {
    let mut tables = Vec::new();
    collect_tables("", map, &mut tables);
    tables
}

fn collect_tables<'a>(
    prefix: &str,
    map: &'a Map<String, Value>,
    tables: &mut Vec<(String, &'a Vec<Value>)>,
) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match val {
            Value::Object(inner) => collect_tables(&name, inner, tables),
            Value::Array(items) if items.iter().any(Value::is_object) => tables.push((name, items)),
            _ => {}
        }
    }
}

pub fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_scalar).collect::<Vec<_>>().join("; "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
