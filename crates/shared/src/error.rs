use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure body the backend may attach to a non-2xx response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Extracts a non-empty `error` string from a raw response body, if any.
    pub fn server_message(raw: &[u8]) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(raw)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown LLM service `{0}` (expected gemini or ollama)")]
pub struct UnknownLlmService(pub String);
