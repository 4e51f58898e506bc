use serde::{Deserialize, Serialize};

use crate::domain::LlmService;

pub const UPLOAD_PATH: &str = "/upload";
pub const ASK_PATH: &str = "/ask";
/// Multipart field carrying the document bytes.
pub const UPLOAD_FIELD: &str = "file";

/// Document types the backend knows how to index.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "csv"];

pub const MISSING_FILE_MESSAGE: &str = "Please select a file to upload.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";
pub const UPLOAD_FAILED_FALLBACK: &str = "File upload failed. Please check the server.";
pub const ASK_FAILED_FALLBACK: &str = "An error occurred while getting the answer.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub llm_service: LlmService,
    /// Always sent, even for the cloud service.
    pub ollama_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskResponse {
    pub answer: String,
}

pub fn is_accepted_document(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_request_uses_backend_field_names() {
        let request = AskRequest {
            question: "What is the capital?".into(),
            llm_service: LlmService::Ollama,
            ollama_model: "mistral".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "question": "What is the capital?",
                "llm_service": "ollama",
                "ollama_model": "mistral",
            })
        );
    }

    #[test]
    fn accepted_documents_match_case_insensitively() {
        assert!(is_accepted_document("report.PDF"));
        assert!(is_accepted_document("notes.v2.txt"));
        assert!(!is_accepted_document("image.png"));
        assert!(!is_accepted_document("README"));
    }
}
