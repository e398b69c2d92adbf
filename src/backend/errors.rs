use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("request rejected (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("server error (status {status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether retrying the same request later can succeed. Conflicts and
    /// other 4xx rejections cannot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated
                | ClientError::Server { .. }
                | ClientError::Timeout
                | ClientError::Transport(_)
        )
    }

    pub(crate) fn from_status(status: StatusCode, body: &Value) -> Self {
        let detail = extract_error_message(body);
        match status {
            StatusCode::UNAUTHORIZED => ClientError::NotAuthenticated,
            StatusCode::FORBIDDEN => ClientError::Forbidden(detail),
            StatusCode::NOT_FOUND => ClientError::NotFound(detail),
            StatusCode::CONFLICT => ClientError::Conflict(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ClientError::Timeout,
            status if status.is_server_error() => {
                ClientError::Server { status: status.as_u16(), detail }
            }
            status => ClientError::Rejected { status: status.as_u16(), detail },
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err.to_string())
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::NotAuthenticated => "not_authenticated",
            ClientError::Forbidden(_) => "forbidden",
            ClientError::NotFound(_) => "not_found",
            ClientError::Conflict(_) => "conflict",
            ClientError::Rejected { .. } => "rejected",
            ClientError::Server { .. } => "server_error",
            ClientError::Timeout => "timeout",
            ClientError::Transport(_) => "transport",
            ClientError::Decode(_) => "decode",
        }
    }
}

pub(crate) fn extract_error_message(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail") {
        if let Some(text) = detail.as_str() {
            return text.to_string();
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.get("message").and_then(Value::as_str))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return joined;
            }
        }
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("unknown_error")
        .to_string()
}
