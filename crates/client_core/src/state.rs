//! Interaction state and its reducer.
//!
//! Every user action, network settlement and timer fire is an [`Intent`];
//! [`InteractionState::apply`] performs the transition and returns the side
//! effects the driver must run. Nothing in here touches the network or the
//! clock, so each transition can be exercised directly.

use std::{path::Path, time::Duration};

use bytes::Bytes;
use shared::{
    domain::{LlmChoice, LlmService},
    protocol::{
        AskRequest, ASK_FAILED_FALLBACK, EMPTY_QUESTION_MESSAGE, MISSING_FILE_MESSAGE,
        UPLOAD_FAILED_FALLBACK,
    },
};
use tracing::warn;

pub const DEFAULT_BANNER_TTL: Duration = Duration::from_secs(5);

/// A user-chosen document held in memory until it is replaced.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Bytes,
    pub media_type: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let media_type = mime_guess::from_path(&name)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            name,
            bytes: bytes.into(),
            media_type,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Ask,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Ask => "ask",
        }
    }

    /// Banner shown when a failure carries no server-supplied text.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Upload => UPLOAD_FAILED_FALLBACK,
            Operation::Ask => ASK_FAILED_FALLBACK,
        }
    }
}

/// What to do with an `upload`/`ask` issued while another request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Dispatch anyway; the busy flag stays up until every request settles.
    Permit,
    /// Refuse the new request without touching state.
    #[default]
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionConfig {
    pub banner_ttl: Duration,
    /// Whether the upload success banner expires like the error banner does.
    /// Off by default: asking stays gated on that banner being present.
    pub expire_upload_status: bool,
    pub concurrency: ConcurrencyPolicy,
    pub initial_llm: LlmChoice,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            banner_ttl: DEFAULT_BANNER_TTL,
            expire_upload_status: false,
            concurrency: ConcurrencyPolicy::default(),
            initial_llm: LlmChoice::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Intent {
    SelectFile(SelectedFile),
    SetQuestion(String),
    SetLlmService(LlmService),
    SetModelName(String),
    Upload,
    Ask,
    /// `Err` carries the already-normalized banner text.
    UploadSettled(Result<String, String>),
    AskSettled(Result<String, String>),
    /// A failure outside any request, e.g. the chosen file could not be read.
    ReportError(String),
    DismissBanners { revision: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload(SelectedFile),
    Ask(AskRequest),
    /// Replace any pending dismissal with one for `revision`.
    ArmDismiss { revision: u64, after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionState {
    config: InteractionConfig,
    pub selected_file: Option<SelectedFile>,
    pub upload_status: Option<String>,
    pub question: String,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub llm: LlmChoice,
    pub in_flight: u32,
    pub revision: u64,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl InteractionState {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            llm: config.initial_llm.clone(),
            config,
            selected_file: None,
            upload_status: None,
            question: String::new(),
            answer: None,
            error: None,
            in_flight: 0,
            revision: 0,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn can_upload(&self) -> bool {
        !self.busy() && self.selected_file.is_some()
    }

    /// Questions can be typed only once a document has been indexed.
    pub fn question_enabled(&self) -> bool {
        self.upload_status.is_some()
    }

    pub fn can_ask(&self) -> bool {
        !self.busy() && !self.question.is_empty() && self.upload_status.is_some()
    }

    pub fn upload_button_label(&self) -> &'static str {
        if self.busy() && self.upload_status.is_none() {
            "Uploading..."
        } else {
            "Upload"
        }
    }

    pub fn ask_button_label(&self) -> &'static str {
        if self.busy() && self.answer.is_none() {
            "Thinking..."
        } else {
            "Get Answer"
        }
    }

    pub fn show_spinner(&self) -> bool {
        self.busy() && self.answer.is_none()
    }

    fn has_expirable_banner(&self) -> bool {
        self.error.is_some() || (self.config.expire_upload_status && self.upload_status.is_some())
    }

    fn admits_dispatch(&self, op: Operation) -> bool {
        if self.busy() && self.config.concurrency == ConcurrencyPolicy::Reject {
            warn!(
                operation = op.as_str(),
                in_flight = self.in_flight,
                "request refused while another one is outstanding"
            );
            return false;
        }
        true
    }

    fn settle(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn apply(&mut self, intent: Intent) -> Vec<Effect> {
        let mut effects = Vec::new();
        let changed = match intent {
            Intent::SelectFile(file) => {
                self.selected_file = Some(file);
                self.upload_status = None;
                self.error = None;
                true
            }
            Intent::SetQuestion(question) => {
                self.question = question;
                true
            }
            Intent::SetLlmService(service) => {
                self.llm.service = service;
                true
            }
            Intent::SetModelName(model_name) => {
                self.llm.model_name = model_name;
                true
            }
            Intent::Upload => match self.selected_file.clone() {
                None => {
                    self.error = Some(MISSING_FILE_MESSAGE.to_string());
                    true
                }
                Some(_) if !self.admits_dispatch(Operation::Upload) => false,
                Some(file) => {
                    self.in_flight += 1;
                    self.error = None;
                    self.upload_status = None;
                    effects.push(Effect::Upload(file));
                    true
                }
            },
            Intent::Ask => {
                if self.question.is_empty() {
                    self.error = Some(EMPTY_QUESTION_MESSAGE.to_string());
                    true
                } else if !self.admits_dispatch(Operation::Ask) {
                    false
                } else {
                    self.in_flight += 1;
                    self.answer = None;
                    self.error = None;
                    effects.push(Effect::Ask(AskRequest {
                        question: self.question.clone(),
                        llm_service: self.llm.service,
                        ollama_model: self.llm.model_name.clone(),
                    }));
                    true
                }
            }
            Intent::UploadSettled(result) => {
                self.settle();
                match result {
                    Ok(message) => self.upload_status = non_empty(message),
                    Err(message) => {
                        self.error = Some(message);
                        self.upload_status = None;
                    }
                }
                true
            }
            Intent::AskSettled(result) => {
                self.settle();
                match result {
                    Ok(answer) => self.answer = non_empty(answer),
                    Err(message) => self.error = Some(message),
                }
                true
            }
            Intent::ReportError(message) => {
                self.error = non_empty(message);
                true
            }
            Intent::DismissBanners { revision } => {
                if revision != self.revision || !self.has_expirable_banner() {
                    false
                } else {
                    self.error = None;
                    if self.config.expire_upload_status {
                        self.upload_status = None;
                    }
                    true
                }
            }
        };

        if changed {
            self.revision += 1;
            if self.has_expirable_banner() {
                effects.push(Effect::ArmDismiss {
                    revision: self.revision,
                    after: self.config.banner_ttl,
                });
            }
        }
        effects
    }
}

/// An empty banner or answer is treated as absent.
fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
