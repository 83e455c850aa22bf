//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cli::args::{OutputFormat, RestPoseArgs};
use crate::error::Result;
use crate::query::FieldData;

/// One result of a search.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultItemOutput {
    pub rank: u64,
    pub data: FieldData,
}

/// A page of search results.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchOutput {
    pub total_docs: u64,
    pub matches_lower_bound: u64,
    pub matches_estimated: u64,
    pub matches_upper_bound: u64,
    pub has_more: bool,
    pub items: Vec<ResultItemOutput>,
}

/// An exact match count.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountOutput {
    pub matches: u64,
}

/// The state of a checkpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointOutput {
    pub check_id: String,
    pub reached: bool,
    pub total_errors: Option<u64>,
    pub errors: Option<Vec<Value>>,
}

/// A stored document.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentOutput {
    pub data: Map<String, Value>,
    pub terms: Map<String, Value>,
    pub values: Map<String, Value>,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &RestPoseArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &RestPoseArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    let value = serde_json::to_value(result)?;
    print!("{}", render_human(&value));
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &RestPoseArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a value as indented `key: value` lines.
pub fn render_human(value: &Value) -> String {
    let mut out = String::new();
    render_into(&mut out, value, 0);
    out
}

fn render_into(out: &mut String, value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                match value {
                    Value::Object(inner) if !inner.is_empty() => {
                        out.push_str(&format!("{pad}{key}:\n"));
                        render_into(out, value, indent + 1);
                    }
                    Value::Array(items) if items.iter().any(Value::is_object) => {
                        out.push_str(&format!("{pad}{key}:\n"));
                        render_into(out, value, indent + 1);
                    }
                    Value::Array(items) => {
                        let joined: Vec<String> = items.iter().map(scalar).collect();
                        out.push_str(&format!("{pad}{key}: {}\n", joined.join(", ")));
                    }
                    other => out.push_str(&format!("{pad}{key}: {}\n", scalar(other))),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if item.is_object() {
                    out.push_str(&format!("{pad}-\n"));
                    render_into(out, item, indent + 1);
                } else {
                    out.push_str(&format!("{pad}- {}\n", scalar(item)));
                }
            }
        }
        other => out.push_str(&format!("{pad}{}\n", scalar(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_human() {
        let rendered = render_human(&json!({
            "total_docs": 2,
            "items": [{"rank": 0, "data": {"id": ["1"], "tag": ["a", "b"]}}]
        }));
        assert_eq!(
            rendered,
            "items:\n  -\n    data:\n      id: 1\n      tag: a, b\n    rank: 0\ntotal_docs: 2\n"
        );
    }

    #[test]
    fn test_render_list() {
        assert_eq!(render_human(&json!(["a", "b"])), "- a\n- b\n");
    }
}
