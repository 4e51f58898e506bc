//! Line-oriented interactive front-end over the controller.

use std::path::PathBuf;

use anyhow::Result;
use client_core::InteractionState;
use shared::domain::LlmService;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{select, AgentController};

const HELP: &str = "\
commands:
  file <path>            choose a document
  upload                 upload the chosen document
  llm <gemini|ollama>    choose the answering service
  model <name>           model name for the local service
  ask <question>         ask about the uploaded document
  status                 show the current state
  quit";

#[derive(Debug, PartialEq, Eq)]
pub enum SessionCommand {
    File(PathBuf),
    Upload,
    Llm(LlmService),
    Model(String),
    Ask(String),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));

    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("`{verb}` needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "file" | "open" => needs_arg("a path").map(|path| SessionCommand::File(path.into())),
        "upload" => Ok(SessionCommand::Upload),
        "llm" => rest
            .parse()
            .map(SessionCommand::Llm)
            .map_err(|err: shared::error::UnknownLlmService| err.to_string()),
        "model" => needs_arg("a model name").map(SessionCommand::Model),
        "ask" => needs_arg("a question").map(SessionCommand::Ask),
        "status" => Ok(SessionCommand::Status),
        "help" | "?" => Ok(SessionCommand::Help),
        "quit" | "exit" => Ok(SessionCommand::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command `{other}`; try `help`")),
    }
}

/// Lines to print when the published state moves from `prev` to `next`.
pub fn banner_changes(prev: &InteractionState, next: &InteractionState) -> Vec<String> {
    let mut lines = Vec::new();

    if next.busy() && !prev.busy() {
        if next.show_spinner() && next.upload_status.is_some() {
            lines.push(next.ask_button_label().to_string());
        } else {
            lines.push(next.upload_button_label().to_string());
        }
    }
    match (&prev.error, &next.error) {
        (_, Some(error)) if prev.error.as_ref() != Some(error) => {
            lines.push(format!("error: {error}"));
        }
        (Some(_), None) => lines.push("(error dismissed)".to_string()),
        _ => {}
    }
    if let Some(status) = &next.upload_status {
        if prev.upload_status.as_ref() != Some(status) {
            lines.push(format!("status: {status}"));
        }
    }
    if let Some(answer) = &next.answer {
        if prev.answer.as_ref() != Some(answer) {
            lines.push(format!("answer:\n{answer}"));
        }
    }
    lines
}

fn describe(state: &InteractionState) -> String {
    let file = state
        .selected_file
        .as_ref()
        .map(|file| format!("{} ({} bytes)", file.name, file.len()))
        .unwrap_or_else(|| "none".to_string());
    let model = if state.llm.service.is_local() {
        format!(" model={}", state.llm.model_name)
    } else {
        String::new()
    };
    format!(
        "file: {file}\nstatus: {}\nllm: {}{model}\nbusy: {}\nerror: {}",
        state.upload_status.as_deref().unwrap_or("-"),
        state.llm.service.label(),
        state.busy(),
        state.error.as_deref().unwrap_or("-"),
    )
}

pub async fn run(controller: AgentController) -> Result<()> {
    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut prev = updates.borrow_and_update().clone();
        while updates.changed().await.is_ok() {
            let next = updates.borrow_and_update().clone();
            for line in banner_changes(&prev, &next) {
                println!("{line}");
            }
            prev = next;
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(reason) => {
                println!("{reason}");
                continue;
            }
        };

        let state = controller.snapshot();
        match command {
            SessionCommand::File(path) => {
                if let Err(err) = select(&controller, &path).await {
                    println!("{err:#}");
                }
            }
            SessionCommand::Upload => {
                controller.upload();
            }
            SessionCommand::Llm(service) => controller.set_llm_service(service),
            SessionCommand::Model(model) => controller.set_model_name(model),
            SessionCommand::Ask(_) if !state.question_enabled() => {
                println!("upload a document before asking questions");
            }
            SessionCommand::Ask(question) => {
                controller.set_question(question);
                controller.ask();
            }
            SessionCommand::Status => println!("{}", describe(&state)),
            SessionCommand::Help => println!("{HELP}"),
            SessionCommand::Quit => break,
        }
    }

    printer.abort();
    Ok(())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
