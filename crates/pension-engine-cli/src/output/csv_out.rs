use serde_json::Value;
use std::io;

use super::{flatten, format_scalar, result_body};

/// Write output as CSV to stdout. Objects become `field,value` rows with
/// dotted keys; a top-level array (book members, grid points) becomes one
/// row per record.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match result_body(value) {
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in flatten(map) {
                let _ = wtr.write_record([key, val]);
            }
        }
        Value::Array(arr) => write_records(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([format_scalar(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_records(wtr: &mut csv::Writer<io::StdoutLock<'_>>, records: &[Value]) {
    let Some(Value::Object(first)) = records.first() else {
        for item in records {
            let _ = wtr.write_record([format_scalar(item)]);
        }
        return;
    };

    let headers: Vec<String> = flatten(first).into_iter().map(|(k, _)| k).collect();
    let _ = wtr.write_record(&headers);
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
            let _ = wtr.write_record(&row);
        }
    }
}
