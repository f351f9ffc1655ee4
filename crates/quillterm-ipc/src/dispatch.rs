//! RPC method dispatch.
//!
//! Maps dot-qualified method names to handlers over the shared
//! [`ControlState`]. Parameter validation belongs to the individual
//! handlers; a panic inside a handler is caught and reported as an
//! `internal` error for that request only.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use quillterm_core::{ControlState, ProcessSummary, SupervisorError};

use crate::protocol::{
    code, ApiRequest, ApiResponse, BackgroundClearResult, BackgroundKillResult,
    BackgroundListResult, BackgroundOutputResult, BackgroundStartParams, BackgroundStartResult,
    BackgroundState, BackgroundStatusResult, ProcessIdParams, ReadBufferParams, ReadBufferResult,
    SendKeysParams, SetStatusParams, SetThemeParams, StatusMessageResult, TabsResult,
    TerminalSizeResult, ThemeListResult, ThemeResult, VersionResult,
};

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("process {0} not found")]
    NotFound(u64),

    #[error("{0}")]
    Spawn(String),

    #[error("{0}")]
    Kill(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RpcError::MethodNotFound(_) => code::METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => code::INVALID_PARAMS,
            RpcError::NotFound(_) => code::NOT_FOUND,
            RpcError::Spawn(_) => code::SPAWN_ERROR,
            RpcError::Kill(_) => code::KILL_ERROR,
            RpcError::Internal(_) => code::INTERNAL,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::InvalidParams(e.to_string())
    }
}

impl From<SupervisorError> for RpcError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::NotFound(id) => RpcError::NotFound(id),
            SupervisorError::EmptyCommand
            | SupervisorError::LimitReached(_)
            | SupervisorError::Spawn(_) => RpcError::Spawn(e.to_string()),
            SupervisorError::Kill { .. } => RpcError::Kill(e.to_string()),
        }
    }
}

pub struct RpcDispatcher {
    state: Arc<ControlState>,
}

impl RpcDispatcher {
    #[must_use]
    pub fn new(state: Arc<ControlState>) -> Self {
        Self { state }
    }

    /// Handle one request, always producing a response with the caller's id.
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        debug!(method = %request.method, id = %request.id, "handling rpc request");
        let id = request.id.clone();
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&request))) {
            Ok(Ok(value)) => ApiResponse::success(id, value),
            Ok(Err(e)) => ApiResponse::error(id, e.code(), e.to_string()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                error!(method = %request.method, "rpc handler panicked: {message}");
                ApiResponse::error(id, code::INTERNAL, format!("handler panicked: {message}"))
            }
        }
    }

    fn dispatch(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        match request.method.as_str() {
            // Background process operations
            "background.start" => self.background_start(request),
            "background.status" => self.background_status(request),
            "background.output" => self.background_output(request),
            "background.kill" => self.background_kill(request),
            "background.list" => self.background_list(),
            "background.clear" => self.background_clear(),

            // Terminal operations
            "terminal.send_keys" => self.terminal_send_keys(request),
            "terminal.read_buffer" => self.terminal_read_buffer(request),
            "terminal.get_size" => self.terminal_get_size(),

            // Layout and tabs
            "layout.get_state" => self.layout_get_state(),
            "tabs.list" => self.tabs_list(),

            // System operations
            "system.get_status" => self.system_get_status(),
            "system.set_status" => self.system_set_status(request),
            "system.get_version" => self.system_get_version(),

            // Theme operations
            "theme.get" => self.theme_get(),
            "theme.set" => self.theme_set(request),
            "theme.list" => self.theme_list(),

            _ => Err(RpcError::MethodNotFound(request.method.clone())),
        }
    }

    // ========================================================================
    // Background process operations
    // ========================================================================

    fn background_start(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: BackgroundStartParams = serde_json::from_value(request.params.clone())?;
        let id = self.state.background.start(&params.command)?;
        serde_json::to_value(BackgroundStartResult { id })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn background_status(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: ProcessIdParams = serde_json::from_value(request.params.clone())?;
        let summary = self.state.background.status(params.id)?;
        let result = status_result(&summary);
        serde_json::to_value(result).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn background_output(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: ProcessIdParams = serde_json::from_value(request.params.clone())?;
        let lines = self.state.background.output(params.id)?;
        let result = BackgroundOutputResult {
            id: params.id,
            lines,
        };
        serde_json::to_value(result).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn background_kill(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: ProcessIdParams = serde_json::from_value(request.params.clone())?;
        self.state.background.kill(params.id)?;
        serde_json::to_value(BackgroundKillResult { success: true })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn background_list(&self) -> Result<Value, RpcError> {
        let processes: Vec<BackgroundStatusResult> = self
            .state
            .background
            .list()
            .iter()
            .map(status_result)
            .collect();
        let result = BackgroundListResult {
            running_count: self.state.background.running_count(),
            failed_count: self.state.background.failed_count(),
            processes,
        };
        serde_json::to_value(result).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn background_clear(&self) -> Result<Value, RpcError> {
        let cleared = self.state.background.clear_finished();
        serde_json::to_value(BackgroundClearResult { cleared })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    // ========================================================================
    // Companion surface
    // ========================================================================

    fn terminal_send_keys(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: SendKeysParams = serde_json::from_value(request.params.clone())?;
        self.state.terminal.send_keys(&params.keys);
        Ok(json!({}))
    }

    fn terminal_read_buffer(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: ReadBufferParams =
            serde_json::from_value(request.params.clone()).unwrap_or_default();
        let lines = self.state.terminal.read_buffer(params.offset, params.lines);
        serde_json::to_value(ReadBufferResult { lines })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn terminal_get_size(&self) -> Result<Value, RpcError> {
        let (cols, rows) = self.state.terminal.size();
        serde_json::to_value(TerminalSizeResult { cols, rows })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn layout_get_state(&self) -> Result<Value, RpcError> {
        serde_json::to_value(self.state.terminal.layout_state())
            .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn tabs_list(&self) -> Result<Value, RpcError> {
        serde_json::to_value(TabsResult {
            tabs: self.state.terminal.tabs(),
        })
        .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn system_get_status(&self) -> Result<Value, RpcError> {
        serde_json::to_value(StatusMessageResult {
            message: self.state.status_message(),
        })
        .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn system_set_status(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: SetStatusParams = serde_json::from_value(request.params.clone())?;
        self.state.set_status_message(params.message);
        Ok(json!({}))
    }

    fn system_get_version(&self) -> Result<Value, RpcError> {
        serde_json::to_value(VersionResult {
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
        .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn theme_get(&self) -> Result<Value, RpcError> {
        serde_json::to_value(ThemeResult {
            name: self.state.current_theme(),
        })
        .map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn theme_set(&self, request: &ApiRequest) -> Result<Value, RpcError> {
        let params: SetThemeParams = serde_json::from_value(request.params.clone())?;
        self.state
            .set_theme(&params.name)
            .map_err(RpcError::InvalidParams)?;
        Ok(json!({ "success": true, "name": params.name }))
    }

    fn theme_list(&self) -> Result<Value, RpcError> {
        serde_json::to_value(ThemeListResult {
            themes: self.state.theme_names(),
            current: self.state.current_theme(),
        })
        .map_err(|e| RpcError::Internal(e.to_string()))
    }
}

fn status_result(summary: &ProcessSummary) -> BackgroundStatusResult {
    BackgroundStatusResult {
        id: summary.id,
        command: summary.command.clone(),
        state: wire_state(&summary.state),
        exit_code: summary.state.exit_code(),
        error_message: summary.state.failure_reason().map(str::to_string),
        duration_ms: summary.duration_ms(),
    }
}

fn wire_state(state: &quillterm_core::ProcessState) -> BackgroundState {
    use quillterm_core::ProcessState;
    match state {
        ProcessState::Running => BackgroundState::Running,
        ProcessState::Completed { .. } => BackgroundState::Completed,
        ProcessState::Failed { .. } => BackgroundState::Failed,
        ProcessState::Killed => BackgroundState::Killed,
    }
}
