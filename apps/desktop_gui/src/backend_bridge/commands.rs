//! Commands queued from UI to the backend worker.

use std::path::PathBuf;

use shared::domain::LlmService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    SelectFile { path: PathBuf },
    SetQuestion(String),
    SetLlmService(LlmService),
    SetModelName(String),
    Upload,
    Ask,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::SelectFile { .. } => "select_file",
            BackendCommand::SetQuestion(_) => "set_question",
            BackendCommand::SetLlmService(_) => "set_llm_service",
            BackendCommand::SetModelName(_) => "set_model_name",
            BackendCommand::Upload => "upload",
            BackendCommand::Ask => "ask",
        }
    }
}
