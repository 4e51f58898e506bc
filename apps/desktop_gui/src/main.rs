mod backend_bridge;
mod controller;
mod ui;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use client_core::{config::normalize_backend_url, load_settings, Controller, HttpAgentClient};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::{backend_bridge::commands::BackendCommand, ui::DocAgentApp};

#[derive(Parser, Debug)]
#[command(name = "docagent-gui", about = "Desktop front-end for the document agent")]
struct Args {
    /// Overrides the configured backend address.
    #[arg(long)]
    backend_url: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings().context("failed to load client settings")?;
    if let Some(url) = &args.backend_url {
        settings.backend_url = normalize_backend_url(url)?;
    }
    tracing::info!(backend_url = %settings.backend_url, "starting desktop gui");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build backend runtime")?;
    let backend =
        HttpAgentClient::from_settings(&settings).context("failed to build HTTP client")?;
    let controller = Controller::with_runtime(
        runtime.handle().clone(),
        backend,
        settings.interaction_config(),
    );
    let state_rx = controller.subscribe();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    // Exits on its own once the app drops its command sender.
    backend_bridge::runtime::launch(cmd_rx, controller, runtime.handle().clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("AI Document Agent")
            .with_inner_size([820.0, 760.0])
            .with_min_inner_size([560.0, 480.0]),
        ..Default::default()
    };
    let handle = runtime.handle().clone();
    eframe::run_native(
        "AI Document Agent",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DocAgentApp::new(
                &cc.egui_ctx,
                &handle,
                cmd_tx,
                state_rx,
            )))
        }),
    )
    .map_err(|err| anyhow!("desktop gui exited with error: {err}"))
}
