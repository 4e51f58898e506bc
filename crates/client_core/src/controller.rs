//! Async driver around [`InteractionState`].
//!
//! Intents are applied under a lock; the resulting effects are started while
//! the lock is still held so that dismissals are armed in revision order.
//! Requests run as detached tasks and feed their outcome back as intents.

use std::{
    path::Path,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use shared::domain::LlmService;
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tracing::{debug, error};

use crate::{
    banner::DismissTimer,
    state::{Effect, Intent, InteractionConfig, InteractionState, Operation, SelectedFile},
    AgentBackend,
};

struct Inner {
    state: InteractionState,
    dismiss: DismissTimer,
}

pub struct Controller<B: AgentBackend + 'static> {
    backend: Arc<B>,
    runtime: Handle,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<InteractionState>,
}

/// Outcome of an `upload`/`ask` call.
#[derive(Debug)]
pub enum Dispatch {
    Sent(RequestHandle),
    /// Validation failed or the request was refused while busy.
    NotSent,
}

impl Dispatch {
    pub fn is_sent(&self) -> bool {
        matches!(self, Dispatch::Sent(_))
    }

    /// Waits for the request, if one was sent, to update state.
    pub async fn settled(self) {
        if let Dispatch::Sent(handle) = self {
            handle.settled().await;
        }
    }
}

#[derive(Debug)]
pub struct RequestHandle(JoinHandle<()>);

impl RequestHandle {
    pub async fn settled(self) {
        if let Err(err) = self.0.await {
            error!(error = %err, "request task ended abnormally");
        }
    }
}

impl<B: AgentBackend + 'static> Controller<B> {
    /// Must be called from within a tokio runtime.
    pub fn new(backend: B, config: InteractionConfig) -> Arc<Self> {
        Self::with_runtime(Handle::current(), backend, config)
    }

    pub fn with_runtime(runtime: Handle, backend: B, config: InteractionConfig) -> Arc<Self> {
        let state = InteractionState::new(config);
        let (snapshots, _) = watch::channel(state.clone());
        Arc::new(Self {
            backend: Arc::new(backend),
            runtime,
            inner: Mutex::new(Inner {
                state,
                dismiss: DismissTimer::new(),
            }),
            snapshots,
        })
    }

    pub fn snapshot(&self) -> InteractionState {
        self.inner.lock().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InteractionState> {
        self.snapshots.subscribe()
    }

    pub fn select_file(self: &Arc<Self>, file: SelectedFile) {
        self.dispatch(Intent::SelectFile(file));
    }

    pub async fn select_path(self: &Arc<Self>, path: &Path) -> std::io::Result<()> {
        let file = SelectedFile::read(path).await?;
        self.select_file(file);
        Ok(())
    }

    /// Shows `message` in the error banner; it expires like any other error.
    pub fn report_error(self: &Arc<Self>, message: impl Into<String>) {
        self.dispatch(Intent::ReportError(message.into()));
    }

    pub fn set_question(self: &Arc<Self>, question: impl Into<String>) {
        self.dispatch(Intent::SetQuestion(question.into()));
    }

    pub fn set_llm_service(self: &Arc<Self>, service: LlmService) {
        self.dispatch(Intent::SetLlmService(service));
    }

    pub fn set_model_name(self: &Arc<Self>, model_name: impl Into<String>) {
        self.dispatch(Intent::SetModelName(model_name.into()));
    }

    pub fn upload(self: &Arc<Self>) -> Dispatch {
        self.dispatch(Intent::Upload)
    }

    pub fn ask(self: &Arc<Self>) -> Dispatch {
        self.dispatch(Intent::Ask)
    }

    fn dispatch(self: &Arc<Self>, intent: Intent) -> Dispatch {
        let mut inner = self.inner.lock();
        let effects = inner.state.apply(intent);
        self.snapshots.send_replace(inner.state.clone());

        let mut dispatched = Dispatch::NotSent;
        for effect in effects {
            match effect {
                Effect::Upload(file) => {
                    dispatched = Dispatch::Sent(self.spawn_upload(file));
                }
                Effect::Ask(request) => {
                    dispatched = Dispatch::Sent(self.spawn_ask(request));
                }
                Effect::ArmDismiss { revision, after } => {
                    let weak = Arc::downgrade(self);
                    inner
                        .dismiss
                        .arm(&self.runtime, revision, after, fire_dismiss(weak, revision));
                }
            }
        }
        dispatched
    }

    fn spawn_upload(self: &Arc<Self>, file: SelectedFile) -> RequestHandle {
        let this = Arc::clone(self);
        debug!(file = %file.name, "dispatching upload");
        RequestHandle(self.runtime.spawn(async move {
            let result = this.backend.upload(&file).await.map_err(|err| {
                error!(file = %file.name, error = %err, "error uploading file");
                err.banner_text(Operation::Upload)
            });
            this.dispatch(Intent::UploadSettled(result));
        }))
    }

    fn spawn_ask(self: &Arc<Self>, request: shared::protocol::AskRequest) -> RequestHandle {
        let this = Arc::clone(self);
        debug!(llm_service = %request.llm_service, "dispatching question");
        RequestHandle(self.runtime.spawn(async move {
            let result = this.backend.ask(&request).await.map_err(|err| {
                error!(error = %err, "error asking question");
                err.banner_text(Operation::Ask)
            });
            this.dispatch(Intent::AskSettled(result));
        }))
    }
}

async fn fire_dismiss<B: AgentBackend + 'static>(controller: Weak<Controller<B>>, revision: u64) {
    if let Some(controller) = controller.upgrade() {
        controller.dispatch(Intent::DismissBanners { revision });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
