use serde_json::Value;
use std::io;

use super::{flatten_fields, format_scalar};

/// Write output as CSV to stdout.
///
/// A simulated path, when present, is written as one row per period;
/// otherwise the result is written as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(Value::Array(path)) = map.get("path") {
                write_array_csv(&mut wtr, path);
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in flatten_fields(map) {
                    let _ = wtr.write_record([key, format_csv_value(&val)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([format_csv_value(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([format_csv_value(item)]);
        }
    }
}

/// Full arrays in CSV cells, JSON-encoded, so nothing is lost.
fn format_csv_value(value: &Value) -> String {
    match value {
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        other => format_scalar(other),
    }
}
