use serde_json::Value;
use tabled::{Table, builder::Builder};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Some(grid) = as_grid(result) {
        print_grid(&grid);
    } else if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        let mut nested = Vec::new();
        for (key, val) in res_map {
            // Lists of records (legs, payoff points) get their own table below
            if is_record_list(val) {
                nested.push((key, val));
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
        for (key, val) in nested {
            println!("\n{}:", key);
            if let Value::Array(arr) = val {
                print_array_table(arr);
            }
        }
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    // Print methodology
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// A sensitivity grid: row labels, column labels and a value matrix.
pub(crate) struct Grid<'a> {
    pub corner: String,
    pub rows: &'a [Value],
    pub cols: &'a [Value],
    pub matrix: &'a [Value],
}

pub(crate) fn as_grid(value: &Value) -> Option<Grid<'_>> {
    let map = value.as_object()?;
    let matrix = map.get("matrix")?.as_array()?;
    let rows = map.get("row_values")?.as_array()?;
    let cols = map.get("col_values")?.as_array()?;
    let label = |k: &str| map.get(k).and_then(Value::as_str).unwrap_or("").to_string();
    Some(Grid {
        corner: format!("{} \\ {}", label("row_variable"), label("col_variable")),
        rows,
        cols,
        matrix,
    })
}

fn print_grid(grid: &Grid<'_>) {
    let mut builder = Builder::default();
    let mut header = vec![grid.corner.clone()];
    header.extend(grid.cols.iter().map(format_number));
    builder.push_record(header);
    for (row_value, row) in grid.rows.iter().zip(grid.matrix) {
        let mut record = vec![format_number(row_value)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_number));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        let table = Table::from(builder);
        println!("{}", table);
    } else {
        // Simple array of values
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if matches!(arr.first(), Some(Value::Object(_))))
}

fn format_number(value: &Value) -> String {
    match value.as_f64() {
        Some(x) => format!("{:.4}", x),
        None => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
