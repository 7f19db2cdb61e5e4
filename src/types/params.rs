//! Request parameter payloads for app-server methods
//!
//! Field names follow the server's camelCase wire format.

use serde::{Deserialize, Serialize};

use super::identifiers::ThreadId;

/// Client identity sent with `initialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Machine readable client name
    pub name: String,
    /// Client version
    pub version: String,
    /// Optional display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "codex_app_client".to_string(),
            version: crate::VERSION.to_string(),
            title: None,
        }
    }
}

/// `initialize` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Client identity
    pub client_info: ClientInfo,
}

/// `thread/list` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListParams {
    /// Pagination cursor from a previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Sort key, e.g. `updated_at`
    pub sort_key: String,
    /// Restrict to threads rooted at this working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// `thread/start` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadStartParams {
    /// Model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Working directory for the new thread
    pub cwd: String,
    /// Approval policy, e.g. `never`
    pub approval_policy: String,
    /// Sandbox mode, e.g. `workspace-write`
    pub sandbox: String,
}

/// `thread/resume` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResumeParams {
    /// Thread to resume
    pub thread_id: ThreadId,
    /// Working directory
    pub cwd: String,
    /// Approval policy
    pub approval_policy: String,
    /// Sandbox mode
    pub sandbox: String,
}

/// One piece of user input for a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UserInput {
    /// Plain text
    Text {
        /// Text content
        text: String,
    },
}

/// `turn/start` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStartParams {
    /// Thread the turn belongs to
    pub thread_id: ThreadId,
    /// User input items
    pub input: Vec<UserInput>,
    /// Model override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Reasoning effort override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
}

/// `turn/interrupt` parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInterruptParams {
    /// Thread whose running turn should stop
    pub thread_id: ThreadId,
}
