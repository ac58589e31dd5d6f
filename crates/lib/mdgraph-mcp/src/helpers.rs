use std::borrow::Cow;

use mdgraph_core::control::ControlError;
use mdgraph_core::snapshot::SnapshotError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;

pub fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub fn invalid_params(message: impl Into<Cow<'static, str>>) -> ErrorData {
    mcp_err(ErrorCode::INVALID_PARAMS, message)
}

/// Maps a control-plane failure onto an MCP error.
///
/// Caller mistakes (empty ids, objects imported without an id, a snapshot
/// directory that does not exist or escapes its root) are `INVALID_PARAMS`;
/// everything else is internal.
pub fn map_err(err: ControlError) -> ErrorData {
    match err {
        ControlError::Validation(message) => invalid_params(message),
        ControlError::Snapshot(
            err @ (SnapshotError::NotFound { .. } | SnapshotError::PathEscape { .. }),
        ) => invalid_params(err.to_string()),
        ControlError::Snapshot(err) => mcp_err(
            ErrorCode::INTERNAL_ERROR,
            format!("snapshot load failed: {err}"),
        ),
        ControlError::Store(err) if err.is_invalid_input() => invalid_params(err.to_string()),
        ControlError::Store(err) => {
            mcp_err(ErrorCode::INTERNAL_ERROR, format!("store error: {err}"))
        }
        ControlError::Canceled => mcp_err(ErrorCode::INTERNAL_ERROR, "request canceled"),
        ControlError::DeadlineExceeded => {
            mcp_err(ErrorCode::INTERNAL_ERROR, "request deadline exceeded")
        }
    }
}
