//! Backend worker: drains the UI command queue into the controller.

use std::{
    path::Path,
    sync::Arc,
    thread::{self, JoinHandle},
};

use client_core::{AgentBackend, Controller};
use crossbeam_channel::Receiver;
use tokio::runtime::Handle;

use crate::backend_bridge::commands::BackendCommand;

pub fn launch<B: AgentBackend + 'static>(
    cmd_rx: Receiver<BackendCommand>,
    controller: Arc<Controller<B>>,
    runtime: Handle,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for cmd in cmd_rx.iter() {
            execute(&controller, &runtime, cmd);
        }
        tracing::debug!("ui command queue closed; backend worker exiting");
    })
}

fn read_failure_message(path: &Path, err: &std::io::Error) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("Could not read {name}: {err}")
}

fn execute<B: AgentBackend + 'static>(
    controller: &Arc<Controller<B>>,
    runtime: &Handle,
    cmd: BackendCommand,
) {
    match cmd {
        BackendCommand::SelectFile { path } => {
            if let Err(err) = runtime.block_on(controller.select_path(&path)) {
                tracing::error!(path = %path.display(), error = %err, "failed to read selected file");
                controller.report_error(read_failure_message(&path, &err));
            }
        }
        BackendCommand::SetQuestion(question) => controller.set_question(question),
        BackendCommand::SetLlmService(service) => controller.set_llm_service(service),
        BackendCommand::SetModelName(model) => controller.set_model_name(model),
        BackendCommand::Upload => {
            controller.upload();
        }
        BackendCommand::Ask => {
            controller.ask();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        time::{SystemTime, UNIX_EPOCH},
    };

    use async_trait::async_trait;
    use client_core::{BackendError, InteractionConfig, SelectedFile};
    use crossbeam_channel::bounded;
    use shared::{domain::LlmService, protocol::AskRequest};

    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl AgentBackend for EchoBackend {
        async fn upload(&self, file: &SelectedFile) -> Result<String, BackendError> {
            Ok(format!("Successfully uploaded and processed {}", file.name))
        }

        async fn ask(&self, request: &AskRequest) -> Result<String, BackendError> {
            Ok(format!("echo: {}", request.question))
        }
    }

    #[test]
    fn worker_applies_queued_commands_in_order() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let controller = Controller::with_runtime(
            runtime.handle().clone(),
            EchoBackend,
            InteractionConfig::default(),
        );

        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("docagent_gui_bridge_{suffix}.txt"));
        fs::write(&path, "bridge contents").expect("write temp file");

        let (tx, rx) = bounded(8);
        let worker = launch(rx, Arc::clone(&controller), runtime.handle().clone());
        tx.send(BackendCommand::SelectFile { path: path.clone() })
            .expect("send");
        tx.send(BackendCommand::SetLlmService(LlmService::Ollama))
            .expect("send");
        tx.send(BackendCommand::SetModelName("mistral".into()))
            .expect("send");
        tx.send(BackendCommand::SetQuestion("hello".into()))
            .expect("send");
        drop(tx);
        worker.join().expect("worker thread");

        let state = controller.snapshot();
        let file = state.selected_file.expect("file selected");
        assert_eq!(&*file.bytes, b"bridge contents");
        assert_eq!(state.llm.service, LlmService::Ollama);
        assert_eq!(state.llm.model_name, "mistral");
        assert_eq!(state.question, "hello");

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn unreadable_selection_shows_error_banner() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let controller = Controller::with_runtime(
            runtime.handle().clone(),
            EchoBackend,
            InteractionConfig::default(),
        );
        controller.select_file(SelectedFile::new("kept.txt", "earlier pick"));

        let path = env::temp_dir().join("docagent_gui_bridge_missing/nowhere.pdf");
        let (tx, rx) = bounded(8);
        let worker = launch(rx, Arc::clone(&controller), runtime.handle().clone());
        tx.send(BackendCommand::SelectFile { path }).expect("send");
        drop(tx);
        worker.join().expect("worker thread");

        let state = controller.snapshot();
        let error = state.error.expect("read failure reported");
        assert!(error.starts_with("Could not read nowhere.pdf"), "{error}");
        assert_eq!(
            state.selected_file.map(|file| file.name),
            Some("kept.txt".to_string())
        );
    }
}
