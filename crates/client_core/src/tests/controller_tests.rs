use super::*;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use shared::protocol::AskRequest;
use tokio::sync::Semaphore;

use crate::{state::ConcurrencyPolicy, BackendError};

#[derive(Clone)]
enum Reply {
    Ok(String),
    Status(u16, Option<String>),
    Malformed,
}

impl Reply {
    fn into_result(self) -> Result<String, BackendError> {
        match self {
            Reply::Ok(text) => Ok(text),
            Reply::Status(status, server_message) => Err(BackendError::Status {
                status,
                server_message,
            }),
            Reply::Malformed => Err(BackendError::MalformedBody("expected value".into())),
        }
    }
}

struct ScriptedBackend {
    upload_reply: Reply,
    ask_reply: Reply,
    gate: Option<Arc<Semaphore>>,
    upload_calls: AtomicUsize,
    asked: parking_lot::Mutex<Vec<AskRequest>>,
}

impl ScriptedBackend {
    fn new(upload_reply: Reply, ask_reply: Reply) -> Self {
        Self {
            upload_reply,
            ask_reply,
            gate: None,
            upload_calls: AtomicUsize::new(0),
            asked: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
    }
}

#[async_trait]
impl AgentBackend for ScriptedBackend {
    async fn upload(&self, _file: &SelectedFile) -> Result<String, BackendError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.upload_reply.clone().into_result()
    }

    async fn ask(&self, request: &AskRequest) -> Result<String, BackendError> {
        self.asked.lock().push(request.clone());
        self.wait_gate().await;
        self.ask_reply.clone().into_result()
    }
}

fn sample_file() -> SelectedFile {
    SelectedFile::new("facts.txt", b"Paris is the capital of France.".to_vec())
}

fn happy_backend() -> ScriptedBackend {
    ScriptedBackend::new(
        Reply::Ok("Indexed 3 chunks".into()),
        Reply::Ok("Paris".into()),
    )
}

#[tokio::test]
async fn upload_without_file_issues_no_request() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());

    let dispatch = controller.upload();

    assert!(!dispatch.is_sent());
    let state = controller.snapshot();
    assert_eq!(state.error.as_deref(), Some("Please select a file to upload."));
    assert_eq!(controller.backend.upload_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ask_with_empty_question_issues_no_request() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());

    assert!(!controller.ask().is_sent());
    assert_eq!(
        controller.snapshot().error.as_deref(),
        Some("Please enter a question.")
    );
    assert!(controller.backend.asked.lock().is_empty());
}

#[tokio::test]
async fn upload_then_ask_populates_status_and_answer() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());

    controller.select_file(sample_file());
    controller.upload().settled().await;
    let state = controller.snapshot();
    assert_eq!(state.upload_status.as_deref(), Some("Indexed 3 chunks"));
    assert!(state.error.is_none());

    controller.set_llm_service(LlmService::Ollama);
    controller.set_model_name("mistral");
    controller.set_question("What is the capital of France?");
    controller.ask().settled().await;

    let state = controller.snapshot();
    assert_eq!(state.answer.as_deref(), Some("Paris"));
    assert!(!state.busy());
    let asked = controller.backend.asked.lock().clone();
    assert_eq!(
        asked,
        vec![AskRequest {
            question: "What is the capital of France?".into(),
            llm_service: LlmService::Ollama,
            ollama_model: "mistral".into(),
        }]
    );
}

#[tokio::test]
async fn server_error_text_reaches_banner() {
    let backend = ScriptedBackend::new(
        Reply::Status(400, Some("Unsupported file type".into())),
        Reply::Ok(String::new()),
    );
    let controller = Controller::new(backend, InteractionConfig::default());

    controller.select_file(sample_file());
    controller.upload().settled().await;

    let state = controller.snapshot();
    assert_eq!(state.error.as_deref(), Some("Unsupported file type"));
    assert!(state.upload_status.is_none());
}

#[tokio::test]
async fn missing_server_text_falls_back_per_operation() {
    let backend = ScriptedBackend::new(Reply::Status(502, None), Reply::Malformed);
    let controller = Controller::new(backend, InteractionConfig::default());

    controller.select_file(sample_file());
    controller.upload().settled().await;
    assert_eq!(
        controller.snapshot().error.as_deref(),
        Some("File upload failed. Please check the server.")
    );
}

#[tokio::test]
async fn malformed_answer_falls_back_to_ask_message() {
    let backend = ScriptedBackend::new(Reply::Ok("ok".into()), Reply::Malformed);
    let controller = Controller::new(backend, InteractionConfig::default());

    controller.select_file(sample_file());
    controller.upload().settled().await;
    controller.set_question("anything");
    controller.ask().settled().await;

    let state = controller.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("An error occurred while getting the answer.")
    );
    assert!(state.answer.is_none());
}

#[tokio::test]
async fn busy_flag_spans_exactly_the_outstanding_request() {
    for reply in [Reply::Ok("done".into()), Reply::Status(500, None)] {
        let gate = Arc::new(Semaphore::new(0));
        let backend = ScriptedBackend::new(reply, Reply::Ok(String::new())).gated(gate.clone());
        let controller = Controller::new(backend, InteractionConfig::default());
        controller.select_file(sample_file());
        assert!(!controller.snapshot().busy());

        let dispatch = controller.upload();
        assert!(dispatch.is_sent());
        tokio::task::yield_now().await;
        assert!(controller.snapshot().busy(), "busy while in flight");

        gate.add_permits(1);
        dispatch.settled().await;
        assert!(!controller.snapshot().busy(), "cleared after settlement");
    }
}

#[tokio::test]
async fn second_request_is_refused_while_busy_by_default() {
    let gate = Arc::new(Semaphore::new(0));
    let controller = Controller::new(
        happy_backend().gated(gate.clone()),
        InteractionConfig::default(),
    );
    controller.select_file(sample_file());

    let first = controller.upload();
    let second = controller.upload();
    assert!(first.is_sent());
    assert!(!second.is_sent());

    gate.add_permits(1);
    first.settled().await;
    assert_eq!(controller.backend.upload_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn permit_policy_lets_requests_overlap() {
    let gate = Arc::new(Semaphore::new(0));
    let controller = Controller::new(
        happy_backend().gated(gate.clone()),
        InteractionConfig {
            concurrency: ConcurrencyPolicy::Permit,
            ..InteractionConfig::default()
        },
    );
    controller.select_file(sample_file());
    controller.set_question("q");

    let upload = controller.upload();
    let ask = controller.ask();
    assert!(upload.is_sent() && ask.is_sent());
    assert_eq!(controller.snapshot().in_flight, 2);

    gate.add_permits(2);
    upload.settled().await;
    ask.settled().await;
    let state = controller.snapshot();
    assert!(!state.busy());
    assert_eq!(state.answer.as_deref(), Some("Paris"));
}

#[tokio::test]
async fn subscribers_observe_every_published_state() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());
    let mut rx = controller.subscribe();

    controller.set_question("hello");
    rx.changed().await.expect("sender alive");
    assert_eq!(rx.borrow_and_update().question, "hello");
}

#[tokio::test(start_paused = true)]
async fn error_banner_expires_after_quiet_period() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());
    controller.upload();

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert!(controller.snapshot().error.is_some());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(controller.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn any_state_change_restarts_the_expiry() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());
    controller.ask();

    tokio::time::sleep(Duration::from_secs(3)).await;
    controller.set_question("t");

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(
        controller.snapshot().error.as_deref(),
        Some("Please enter a question.")
    );

    tokio::time::sleep(Duration::from_millis(2_600)).await;
    assert!(controller.snapshot().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn upload_status_persists_unless_expiry_enabled() {
    let controller = Controller::new(happy_backend(), InteractionConfig::default());
    controller.select_file(sample_file());
    controller.upload().settled().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        controller.snapshot().upload_status.as_deref(),
        Some("Indexed 3 chunks")
    );

    let controller = Controller::new(
        happy_backend(),
        InteractionConfig {
            expire_upload_status: true,
            ..InteractionConfig::default()
        },
    );
    controller.select_file(sample_file());
    controller.upload().settled().await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(controller.snapshot().upload_status.is_none());
}
