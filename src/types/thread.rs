//! Thread listing types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identifiers::ThreadId;

/// Working directory assumed when the server omits one
pub const DEFAULT_THREAD_CWD: &str = "/tmp";

/// Summary of one thread as returned by `thread/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    /// Thread ID
    pub id: ThreadId,
    /// First user message or server generated preview
    pub preview: String,
    /// Working directory of the thread
    pub cwd: String,
    /// Last update time as reported by the server (0 when unknown)
    pub updated_at: i64,
}

impl ThreadSummary {
    /// Leniently read one `thread/list` entry
    ///
    /// Entries without a string or numeric `id` are rejected. Missing `preview`
    /// becomes empty, missing `cwd` becomes [`DEFAULT_THREAD_CWD`], and
    /// `updatedAt` may be a number or a numeric string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = obj.get("id").and_then(scalar_string)?;
        let preview = obj.get("preview").and_then(scalar_string).unwrap_or_default();
        let cwd = obj
            .get("cwd")
            .and_then(scalar_string)
            .unwrap_or_else(|| DEFAULT_THREAD_CWD.to_string());
        let updated_at = obj
            .get("updatedAt")
            .and_then(scalar_string)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        Some(Self {
            id: ThreadId::new(id),
            preview,
            cwd,
            updated_at,
        })
    }

    /// Read every usable entry of a `thread/list` result's `data` array
    #[must_use]
    pub fn list_from_result(result: &Value) -> Vec<Self> {
        result
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Self::from_value).collect())
            .unwrap_or_default()
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
