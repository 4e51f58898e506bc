use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    error::ErrorBody,
    protocol::{AskRequest, AskResponse, UploadResponse, ASK_PATH, UPLOAD_FIELD, UPLOAD_PATH},
};
use thiserror::Error;
use tracing::{debug, info};

pub mod banner;
pub mod config;
pub mod controller;
pub mod state;

pub use config::{load_settings, ClientSettings};
pub use controller::{Controller, Dispatch, RequestHandle};
pub use state::{
    ConcurrencyPolicy, Effect, Intent, InteractionConfig, InteractionState, Operation,
    SelectedFile,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}")]
    Status {
        status: u16,
        server_message: Option<String>,
    },
    #[error("backend response could not be decoded: {0}")]
    MalformedBody(String),
}

impl BackendError {
    /// Text the backend supplied in its `error` field, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Status {
                server_message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// Network failures, 4xx and 5xx all collapse into one banner string.
    pub fn banner_text(&self, operation: Operation) -> String {
        self.server_message()
            .unwrap_or_else(|| operation.fallback_message())
            .to_string()
    }
}

/// The remote service that indexes documents and answers questions.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn upload(&self, file: &SelectedFile) -> Result<String, BackendError>;
    async fn ask(&self, request: &AskRequest) -> Result<String, BackendError>;
}

pub struct HttpAgentClient {
    http: Client,
    base_url: String,
}

impl HttpAgentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            base_url: settings.backend_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let raw = response.bytes().await?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            server_message: ErrorBody::server_message(&raw),
        });
    }
    serde_json::from_slice(&raw).map_err(|err| BackendError::MalformedBody(err.to_string()))
}

#[async_trait]
impl AgentBackend for HttpAgentClient {
    async fn upload(&self, file: &SelectedFile) -> Result<String, BackendError> {
        let mut part = Part::stream_with_length(Body::from(file.bytes.clone()), file.len() as u64)
            .file_name(file.name.clone());
        if let Some(media_type) = &file.media_type {
            part = part.mime_str(media_type)?;
        }
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(file = %file.name, bytes = file.len(), "uploading document");
        let response = self
            .http
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = decode(response).await?;
        info!(file = %file.name, message = %body.message, "document uploaded");
        Ok(body.message)
    }

    async fn ask(&self, request: &AskRequest) -> Result<String, BackendError> {
        debug!(
            llm_service = %request.llm_service,
            model = %request.ollama_model,
            "asking question"
        );
        let response = self
            .http
            .post(self.endpoint(ASK_PATH))
            .json(request)
            .send()
            .await?;
        let body: AskResponse = decode(response).await?;
        info!(
            llm_service = %request.llm_service,
            answer_len = body.answer.len(),
            "answer received"
        );
        Ok(body.answer)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
