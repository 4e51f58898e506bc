use client_core::InteractionState;
use crossbeam_channel::Sender;
use eframe::egui;
use shared::{domain::LlmService, protocol::ACCEPTED_EXTENSIONS};
use tokio::{runtime::Handle, sync::watch};

use crate::{
    backend_bridge::commands::BackendCommand, controller::orchestration::dispatch_backend_command,
};

const ERROR_STROKE: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);
const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(185, 28, 28);
const STATUS_STROKE: egui::Color32 = egui::Color32::from_rgb(74, 222, 128);
const STATUS_TEXT: egui::Color32 = egui::Color32::from_rgb(21, 128, 61);

pub struct DocAgentApp {
    cmd_tx: Sender<BackendCommand>,
    state_rx: watch::Receiver<InteractionState>,
    question_draft: String,
    model_draft: String,
    queue_status: String,
}

impl DocAgentApp {
    pub fn new(
        ctx: &egui::Context,
        runtime: &Handle,
        cmd_tx: Sender<BackendCommand>,
        state_rx: watch::Receiver<InteractionState>,
    ) -> Self {
        let initial = state_rx.borrow().clone();

        // Banners expire and requests settle off the UI thread.
        let mut changes = state_rx.clone();
        let repaint = ctx.clone();
        runtime.spawn(async move {
            while changes.changed().await.is_ok() {
                repaint.request_repaint();
            }
        });

        Self {
            cmd_tx,
            state_rx,
            question_draft: initial.question,
            model_draft: initial.llm.model_name,
            queue_status: String::new(),
        }
    }

    fn send(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.queue_status);
    }

    fn show_banners(&self, ui: &mut egui::Ui, state: &InteractionState) {
        if let Some(error) = &state.error {
            banner(ui, error, ERROR_STROKE, ERROR_TEXT);
        }
        if let Some(status) = &state.upload_status {
            banner(ui, status, STATUS_STROKE, STATUS_TEXT);
        }
    }

    fn show_upload_section(&mut self, ui: &mut egui::Ui, state: &InteractionState) {
        ui.heading("1. Upload Your Document");
        ui.horizontal(|ui| {
            if ui.button("Choose file...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Documents", &ACCEPTED_EXTENSIONS)
                    .pick_file()
                {
                    self.send(BackendCommand::SelectFile { path });
                }
            }
            let file_label = state
                .selected_file
                .as_ref()
                .map(|file| file.name.as_str())
                .unwrap_or("No file chosen");
            ui.label(file_label);

            let upload = ui.add_enabled(
                state.can_upload(),
                egui::Button::new(state.upload_button_label()),
            );
            if upload.clicked() {
                self.send(BackendCommand::Upload);
            }
        });
    }

    fn show_model_section(&mut self, ui: &mut egui::Ui, state: &InteractionState) {
        ui.heading("2. Select Your AI Model");
        ui.horizontal(|ui| {
            let mut service = state.llm.service;
            egui::ComboBox::from_id_salt("llm_service")
                .selected_text(service.label())
                .show_ui(ui, |ui| {
                    for option in LlmService::ALL {
                        ui.selectable_value(&mut service, option, option.label());
                    }
                });
            if service != state.llm.service {
                self.send(BackendCommand::SetLlmService(service));
            }

            if service.is_local() {
                let model = ui.add(
                    egui::TextEdit::singleline(&mut self.model_draft)
                        .hint_text("Ollama Model Name (e.g., llama2)"),
                );
                if model.changed() {
                    self.send(BackendCommand::SetModelName(self.model_draft.clone()));
                }
            }
        });
    }

    fn show_question_section(&mut self, ui: &mut egui::Ui, state: &InteractionState) {
        ui.heading("3. Ask a Question");
        let question = ui.add_enabled(
            state.question_enabled(),
            egui::TextEdit::multiline(&mut self.question_draft)
                .desired_rows(3)
                .desired_width(f32::INFINITY)
                .hint_text("e.g., What is the main topic of the document?"),
        );
        if question.changed() {
            self.send(BackendCommand::SetQuestion(self.question_draft.clone()));
        }

        let ask = ui.add_enabled(
            state.can_ask(),
            egui::Button::new(state.ask_button_label()).min_size(egui::vec2(ui.available_width(), 32.0)),
        );
        if ask.clicked() {
            self.send(BackendCommand::Ask);
        }
    }

    fn show_answer(&self, ui: &mut egui::Ui, state: &InteractionState) {
        if state.show_spinner() {
            ui.vertical_centered(|ui| ui.spinner());
        }
        if let Some(answer) = &state.answer {
            ui.group(|ui| {
                ui.strong("Answer:");
                egui::ScrollArea::vertical()
                    .max_height(320.0)
                    .show(ui, |ui| ui.label(answer));
            });
        }
    }
}

fn banner(ui: &mut egui::Ui, text: &str, stroke: egui::Color32, color: egui::Color32) {
    egui::Frame::group(ui.style())
        .stroke(egui::Stroke::new(1.0, stroke))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.colored_label(color, text);
        });
}

impl eframe::App for DocAgentApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = self.state_rx.borrow().clone();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading(egui::RichText::new("AI Document Agent").size(32.0).strong());
                    ui.label("Upload a document and get answers from your own AI.");
                });
                ui.add_space(12.0);

                self.show_banners(ui, &state);
                ui.add_space(8.0);
                self.show_upload_section(ui, &state);
                ui.add_space(16.0);
                self.show_model_section(ui, &state);
                ui.add_space(16.0);
                self.show_question_section(ui, &state);
                ui.add_space(12.0);
                self.show_answer(ui, &state);

                if !self.queue_status.is_empty() {
                    ui.separator();
                    ui.small(egui::RichText::new(&self.queue_status).weak());
                }
            });
        });
    }
}
