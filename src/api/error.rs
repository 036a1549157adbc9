use crate::utils::IsTransient;

// ============================================================================
// Backend Boundary Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Malformed order record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

impl ApiError {
    /// Map a non-2xx response to an error, preferring the JSON error body
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body);
        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(message),
            _ => ApiError::Server { status, message },
        }
    }

    pub fn malformed(id: impl ToString, reason: impl Into<String>) -> Self {
        ApiError::MalformedRecord {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Short label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "network",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Server { .. } => "server",
            ApiError::Decode(_) => "decode",
            ApiError::MalformedRecord { .. } => "malformed",
        }
    }
}

impl IsTransient for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiError::Server { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| {
            ["detail", "error", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| trimmed.to_string())
}
