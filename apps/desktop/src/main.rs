use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_backend_url, load_settings, Controller, HttpAgentClient,
};
use shared::{domain::LlmService, protocol::is_accepted_document};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod session;

type AgentController = Arc<Controller<HttpAgentClient>>;

#[derive(Parser, Debug)]
#[command(name = "docagent", about = "Upload a document and ask questions about it")]
struct Args {
    /// Overrides the configured backend address.
    #[arg(long, global = true)]
    backend_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a document for indexing.
    Upload { path: PathBuf },
    /// Upload a document, then ask one question about it.
    Ask {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        llm: Option<LlmService>,
        #[arg(long)]
        model: Option<String>,
        question: String,
    },
    /// Interactive session reading commands from stdin.
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings().context("failed to load client settings")?;
    if let Some(url) = &args.backend_url {
        settings.backend_url = normalize_backend_url(url)?;
    }
    let backend =
        HttpAgentClient::from_settings(&settings).context("failed to build HTTP client")?;
    let controller = Controller::new(backend, settings.interaction_config());

    match args.command {
        Command::Upload { path } => {
            let status = upload(&controller, &path).await?;
            println!("{status}");
        }
        Command::Ask {
            file,
            llm,
            model,
            question,
        } => {
            upload(&controller, &file).await?;
            if let Some(service) = llm {
                controller.set_llm_service(service);
            }
            if let Some(model) = model {
                controller.set_model_name(model);
            }
            controller.set_question(question);
            controller.ask().settled().await;

            let state = controller.snapshot();
            match (state.answer, state.error) {
                (Some(answer), _) => println!("{answer}"),
                (None, Some(error)) => bail!(error),
                (None, None) => bail!("no answer received"),
            }
        }
        Command::Session => session::run(controller).await?,
    }

    Ok(())
}

async fn select(controller: &AgentController, path: &Path) -> Result<()> {
    if !is_accepted_document(&path.to_string_lossy()) {
        warn!(path = %path.display(), "file type may not be supported by the backend");
    }
    controller
        .select_path(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn upload(controller: &AgentController, path: &Path) -> Result<String> {
    select(controller, path).await?;
    controller.upload().settled().await;

    let state = controller.snapshot();
    match (state.upload_status, state.error) {
        (Some(status), _) => Ok(status),
        (None, Some(error)) => bail!(error),
        (None, None) => bail!("upload did not complete"),
    }
}
