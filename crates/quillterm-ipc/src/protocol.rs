//! Control-plane wire protocol.
//!
//! One JSON object per line in both directions. Requests carry an opaque
//! caller-chosen `id` that is echoed verbatim in the matching response;
//! a response carries exactly one of `result` or `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quillterm_core::TabInfo;

/// String error codes reported in the `error.code` field.
pub mod code {
    pub const PROTOCOL_ERROR: &str = "protocol_error";
    pub const METHOD_NOT_FOUND: &str = "method_not_found";
    pub const INVALID_PARAMS: &str = "invalid_params";
    pub const NOT_FOUND: &str = "not_found";
    pub const SPAWN_ERROR: &str = "spawn_error";
    pub const KILL_ERROR: &str = "kill_error";
    pub const INTERNAL: &str = "internal";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Correlation id, chosen by the caller and echoed back verbatim.
    pub id: String,
    /// Dot-qualified method name (e.g. "background.start").
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

impl ApiResponse {
    #[must_use]
    pub fn success(id: String, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: String, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ApiErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    #[must_use]
    pub fn protocol_error(id: String, message: impl Into<String>) -> Self {
        Self::error(id, code::PROTOCOL_ERROR, message)
    }
}

// ============================================================================
// Background process parameters and results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundStartParams {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundStartResult {
    pub id: u64,
}

/// Parameters for any background method addressing one process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessIdParams {
    pub id: u64,
}

/// Wire labels for process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundState {
    Running,
    Completed,
    Failed,
    Killed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundStatusResult {
    pub id: u64,
    pub command: String,
    pub state: BackgroundState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundOutputResult {
    pub id: u64,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundKillResult {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundListResult {
    pub processes: Vec<BackgroundStatusResult>,
    pub running_count: usize,
    pub failed_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundClearResult {
    pub cleared: usize,
}

// ============================================================================
// Companion surface parameters and results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendKeysParams {
    pub keys: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReadBufferParams {
    #[serde(default)]
    pub lines: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadBufferResult {
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSizeResult {
    pub cols: u16,
    pub rows: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabsResult {
    pub tabs: Vec<TabInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessageResult {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusParams {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResult {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeResult {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetThemeParams {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeListResult {
    pub themes: Vec<String>,
    pub current: String,
}
