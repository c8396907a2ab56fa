use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl From<crate::cli::OutputFormat> for OutputFormat {
    /// `auto` renders tables, the format a person at a terminal reads
    fn from(format: crate::cli::OutputFormat) -> Self {
        match format {
            crate::cli::OutputFormat::Json => OutputFormat::Json,
            crate::cli::OutputFormat::Yaml => OutputFormat::Yaml,
            crate::cli::OutputFormat::Auto | crate::cli::OutputFormat::Table => {
                OutputFormat::Table
            }
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_table(&json_value));
        }
    }

    Ok(())
}

/// ARM resources nest their payload under `properties`; flatten one level
/// so a single resource reads as one key/value table
fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            // Get headers from first object
            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                match val {
                    Value::Object(inner) if key == "properties" => {
                        for (inner_key, inner_val) in inner {
                            table.add_row(vec![
                                format!("properties.{}", inner_key),
                                format_value(inner_val),
                            ]);
                        }
                    }
                    _ => {
                        table.add_row(vec![key.clone(), format_value(val)]);
                    }
                }
            }

            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auto_maps_to_table() {
        assert_eq!(
            OutputFormat::from(crate::cli::OutputFormat::Auto),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from(crate::cli::OutputFormat::Yaml),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn test_table_flattens_properties() {
        let rendered = render_table(&json!({
            "name": "g1",
            "properties": { "displayName": "Group one", "provisioningState": "Succeeded" }
        }));
        assert!(rendered.contains("properties.displayName"));
        assert!(rendered.contains("Group one"));
        assert!(rendered.contains("g1"));
    }

    #[test]
    fn test_nested_values_are_summarised() {
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({ "a": 1 })), "{1 fields}");
        assert_eq!(format_value(&Value::Null), "null");
    }
}
