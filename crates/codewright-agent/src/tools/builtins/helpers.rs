//! Shared argument extraction and checkpoint plumbing for builtin tools.

use serde_json::Value;

use crate::tools::context::{ToolCtx, ToolError};

pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgs(format!("{key} is required")))
}

pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

pub fn required_usize(args: &Value, key: &str) -> Result<usize, ToolError> {
    let value = args
        .get(key)
        .ok_or_else(|| ToolError::InvalidArgs(format!("{key} is required")))?;
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| ToolError::InvalidArgs(format!("{key} must be a non-negative integer")))
}

pub fn optional_usize(args: &Value, key: &str) -> Result<Option<usize>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| ToolError::InvalidArgs(format!("{key} must be a non-negative integer"))),
    }
}

pub fn optional_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn string_array(args: &Value, key: &str) -> Result<Option<Vec<String>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) => out.push(s.to_string()),
                    None => {
                        return Err(ToolError::InvalidArgs(format!("{key} must contain only strings")));
                    }
                }
            }
            Ok(Some(out))
        }
        Some(_) => Err(ToolError::InvalidArgs(format!("{key} must be an array"))),
    }
}

/// Optional integrated checkpointing: when the call carries a `checkpoint`
/// argument, commit the workspace after a successful write. An empty string
/// selects the auto-generated message.
pub async fn maybe_checkpoint(ctx: &ToolCtx, args: &Value, operation: &str, path: &str) -> Option<String> {
    let requested = match args.get("checkpoint") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Bool(true)) => Some(String::new()),
        _ => None,
    }?;

    let message = if requested.trim().is_empty() {
        format!("auto-checkpoint: {operation} {path}")
    } else {
        requested
    };

    match ctx.git.checkpoint(&message).await {
        Ok(result) => Some(format!("📌 {result}")),
        Err(e) => Some(format!("⚠️ checkpoint failed: {e}")),
    }
}

/// Schema fragment for the shared optional `checkpoint` parameter.
pub fn checkpoint_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Optional: commit a git checkpoint after a successful write. Empty string uses an auto-generated message."
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_str_reports_missing_keys() {
        let args = json!({"other": 1});
        let err = required_str(&args, "path").unwrap_err();
        assert!(err.to_string().contains("path is required"));
    }

    #[test]
    fn optional_usize_distinguishes_missing_from_invalid() {
        assert_eq!(optional_usize(&json!({}), "n").unwrap(), None);
        assert_eq!(optional_usize(&json!({"n": 3}), "n").unwrap(), Some(3));
        assert!(optional_usize(&json!({"n": -1}), "n").is_err());
        assert!(optional_usize(&json!({"n": "x"}), "n").is_err());
    }

    #[test]
    fn string_array_validates_element_types() {
        assert_eq!(
            string_array(&json!({"lines": ["a", "b"]}), "lines").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(string_array(&json!({"lines": ["a", 1]}), "lines").is_err());
        assert_eq!(string_array(&json!({}), "lines").unwrap(), None);
    }
}
