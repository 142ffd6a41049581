use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten, format_scalar, nested_tables, result_body};

/// Result fields as a two-column table, followed by one table per list of
/// records (alerts, scenarios, stress tests, trades) and the envelope's
/// warnings and methodology.
pub fn print_table(value: &Value) {
    let body = result_body(value);
    match body {
        Value::Object(map) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in flatten(map) {
                builder.push_record([key, val]);
            }
            println!("{}", Table::from(builder));

            for (name, records) in nested_tables(map) {
                println!("\n{}:", name);
                print_records(records);
            }
        }
        Value::Array(arr) => print_records(arr),
        _ => println!("{}", format_scalar(body)),
    }

    let Some(envelope) = value.as_object() else {
        return;
    };
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_records(records: &[Value]) {
    if records.is_empty() {
        println!("(empty)");
        return;
    }
    let Some(Value::Object(first)) = records.first() else {
        for item in records {
            println!("{}", format_scalar(item));
        }
        return;
    };

    let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for item in records {
        if let Value::Object(map) = item {
            let cells = flatten(map);
            let row: Vec<String> = headers
                .iter()
                .map(|h| {
                    cells
                        .iter()
                        .find(|(k, _)| k == h)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
