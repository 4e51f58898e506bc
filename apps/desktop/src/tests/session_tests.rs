use super::*;

use client_core::{Intent, SelectedFile};

#[test]
fn parses_commands_with_arguments() {
    assert_eq!(
        parse_command("file ./docs/report.pdf"),
        Ok(SessionCommand::File("./docs/report.pdf".into()))
    );
    assert_eq!(
        parse_command("  ask   What is the main topic? "),
        Ok(SessionCommand::Ask("What is the main topic?".into()))
    );
    assert_eq!(
        parse_command("llm ollama"),
        Ok(SessionCommand::Llm(LlmService::Ollama))
    );
    assert_eq!(
        parse_command("MODEL mistral"),
        Ok(SessionCommand::Model("mistral".into()))
    );
    assert_eq!(parse_command("upload"), Ok(SessionCommand::Upload));
    assert_eq!(parse_command("exit"), Ok(SessionCommand::Quit));
}

#[test]
fn rejects_missing_arguments_and_unknown_verbs() {
    assert!(parse_command("ask").unwrap_err().contains("question"));
    assert!(parse_command("llm gpt").unwrap_err().contains("gpt"));
    assert!(parse_command("delete everything").is_err());
    assert!(parse_command("   ").is_err());
}

#[test]
fn reports_banner_transitions() {
    let mut prev = InteractionState::default();
    prev.apply(Intent::SelectFile(SelectedFile::new("a.txt", b"x".to_vec())));

    let mut next = prev.clone();
    next.apply(Intent::Upload);
    assert_eq!(banner_changes(&prev, &next), vec!["Uploading...".to_string()]);

    let prev = next.clone();
    next.apply(Intent::UploadSettled(Err("Unsupported file type".into())));
    assert_eq!(
        banner_changes(&prev, &next),
        vec!["error: Unsupported file type".to_string()]
    );

    let prev = next.clone();
    let revision = next.revision;
    next.apply(Intent::DismissBanners { revision });
    assert_eq!(
        banner_changes(&prev, &next),
        vec!["(error dismissed)".to_string()]
    );
}

#[test]
fn reports_answers_once() {
    let mut state = InteractionState::default();
    state.apply(Intent::SelectFile(SelectedFile::new("a.txt", b"x".to_vec())));
    state.apply(Intent::Upload);
    state.apply(Intent::UploadSettled(Ok("Indexed".into())));
    state.apply(Intent::SetQuestion("Capital?".into()));

    let prev = state.clone();
    state.apply(Intent::Ask);
    assert_eq!(banner_changes(&prev, &state), vec!["Thinking...".to_string()]);

    let prev = state.clone();
    state.apply(Intent::AskSettled(Ok("Paris".into())));
    assert_eq!(
        banner_changes(&prev, &state),
        vec!["answer:\nParis".to_string()]
    );
    assert!(banner_changes(&state, &state).is_empty());
}
