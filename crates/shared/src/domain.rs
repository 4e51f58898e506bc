use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownLlmService;

pub const DEFAULT_OLLAMA_MODEL: &str = "llama2";

/// Answer-generation provider the backend should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmService {
    /// Cloud-hosted provider.
    #[default]
    Gemini,
    /// Locally hosted provider; takes a model name.
    Ollama,
}

impl LlmService {
    pub const ALL: [LlmService; 2] = [LlmService::Gemini, LlmService::Ollama];

    pub fn as_str(self) -> &'static str {
        match self {
            LlmService::Gemini => "gemini",
            LlmService::Ollama => "ollama",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LlmService::Gemini => "Gemini (Cloud)",
            LlmService::Ollama => "Ollama (Local)",
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, LlmService::Ollama)
    }
}

impl fmt::Display for LlmService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmService {
    type Err = UnknownLlmService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "cloud" => Ok(LlmService::Gemini),
            "ollama" | "local" => Ok(LlmService::Ollama),
            other => Err(UnknownLlmService(other.to_string())),
        }
    }
}

/// Selected provider plus the local model name. The model name is kept even
/// while the cloud provider is selected so switching back restores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmChoice {
    pub service: LlmService,
    pub model_name: String,
}

impl Default for LlmChoice {
    fn default() -> Self {
        Self {
            service: LlmService::default(),
            model_name: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}
