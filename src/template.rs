//! Argument templates
//!
//! Arguments are Go `text/template` strings rendered with `gtmpl` against the
//! serialized push event, so pipelines, `printf`, `if`/`else`, `range`, `eq`,
//! `index` and `len` all behave as GitHub-hook configs expect.
//!
//! JSON objects become template objects (an unknown field is an error), and
//! `null` becomes the empty string.

use gtmpl::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct TemplateError(String);

/// Converts a serialized event into the value templates are executed against.
pub fn to_context(data: &serde_json::Value) -> Value {
    match data {
        serde_json::Value::Null => Value::String(String::new()),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(to_context).collect()),
        serde_json::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_context(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

/// Parses `template` and executes it against `context`.
pub fn render(template: &str, context: &Value) -> Result<String, TemplateError> {
    gtmpl::template(template, context.clone()).map_err(|e| TemplateError(e.to_string()))
}
