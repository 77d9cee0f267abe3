//! Flattens an arbitrary JSON document into labelled rows for display.
//!
//! Containers produce a header row (no value) followed by their children one
//! level deeper. Traversal is lazy and uses an explicit stack, so deeply
//! nested documents do not recurse.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub depth: usize,
    pub key: String,
    /// `None` for objects and arrays.
    pub value: Option<String>,
}

pub fn flatten(value: &Value) -> Flatten<'_> {
    let mut flatten = Flatten { stack: Vec::new() };
    match value {
        Value::Object(_) | Value::Array(_) => flatten.push_children(0, value),
        scalar => flatten.stack.push((0, String::new(), scalar)),
    }
    flatten
}

pub struct Flatten<'a> {
    stack: Vec<(usize, String, &'a Value)>,
}

impl<'a> Flatten<'a> {
    fn push_children(&mut self, depth: usize, container: &'a Value) {
        // Pushed in reverse so that popping yields document order.
        match container {
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    self.stack.push((depth, key.clone(), child));
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate().rev() {
                    self.stack.push((depth, index.to_string(), child));
                }
            }
            _ => {}
        }
    }
}

impl Iterator for Flatten<'_> {
    type Item = DetailRow;

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, key, value) = self.stack.pop()?;
        let rendered = match value {
            Value::Object(_) | Value::Array(_) => {
                self.push_children(depth + 1, value);
                None
            }
            Value::String(text) => Some(text.clone()),
            scalar => Some(scalar.to_string()),
        };
        Some(DetailRow {
            depth,
            key,
            value: rendered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(depth: usize, key: &str, value: Option<&str>) -> DetailRow {
        DetailRow {
            depth,
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn nested_documents_flatten_in_order() {
        let doc = json!({
            "id": "crash-1",
            "count": 3,
            "env": { "ASAN": "1" },
            "tags": ["a", null]
        });
        let rows: Vec<_> = flatten(&doc).collect();
        assert_eq!(
            rows,
            vec![
                row(0, "id", Some("crash-1")),
                row(0, "count", Some("3")),
                row(0, "env", None),
                row(1, "ASAN", Some("1")),
                row(0, "tags", None),
                row(1, "0", Some("a")),
                row(1, "1", Some("null")),
            ]
        );
    }

    #[test]
    fn scalar_root_is_a_single_row() {
        let rows: Vec<_> = flatten(&json!(true)).collect();
        assert_eq!(rows, vec![row(0, "", Some("true"))]);
    }
}
