mod command;
mod display;
mod helper;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ragchat_application::view::render;
use ragchat_application::{ArtifactKind, ChatController, SubmitOutcome};
use ragchat_core::RagchatError;
use ragchat_core::backend::QueryBackend;
use ragchat_core::config::{QueryTransport, Settings, debug_enabled, load_env_files};
use ragchat_core::format::format_health_status;
use ragchat_interaction::BackendClient;

use command::Command;
use helper::CliHelper;

fn init_tracing(debug: bool) {
    let default_level = if debug { "ragchat=debug" } else { "ragchat=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Interactive chat front end for the document question-answering backend.
///
/// While the free question allowance is used up, plain input is taken as
/// an email address until one is accepted. Slash commands keep working.
#[tokio::main]
async fn main() -> Result<()> {
    let env_failures = load_env_files(Path::new("."));
    init_tracing(debug_enabled(|key| std::env::var(key).ok()));
    for failure in &env_failures {
        warn!("{failure}");
    }
    let settings = Settings::from_env();
    info!(
        backend = settings.backend_url(),
        environment = %settings.environment,
        transport = ?settings.transport,
        "Starting ragchat"
    );

    let client = Arc::new(BackendClient::from_settings(&settings)?);
    let backend: Arc<dyn QueryBackend> = client.clone();
    let mut controller = ChatController::new(backend, &settings);

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper));

    display::print_banner(&settings.app_title, &settings.app_description);
    let health = controller.check_health().await;
    if !health.is_healthy() {
        display::print_info(&format_health_status(&health));
        println!();
    }
    display::print_view(&render(controller.session()));

    loop {
        let blocked = controller.is_quota_blocked();
        let prompt = if blocked { "email> " } else { ">> " };

        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let command = match Command::parse(&line) {
            Command::Ask(address) if blocked => Command::Email(address),
            command => command,
        };

        match command {
            Command::Quit => {
                println!("{}", "Goodbye!".bright_green());
                break;
            }
            Command::Ask(question) => ask(&mut controller, &question).await,
            Command::Email(address) => match controller.capture_email(&address) {
                Ok(()) => {
                    display::print_success("✅ Thank you! You now have unlimited questions.");
                }
                Err(err) => display::print_error(&err),
            },
            Command::Mode(None) => {
                let mode = controller.session().selected_mode;
                display::print_info(&format!("{}: {}", mode.label(), mode.description()));
            }
            Command::Mode(Some(mode)) => {
                if controller.switch_mode(mode) {
                    if let Some(welcome) = render(controller.session()).messages.last() {
                        display::print_message(welcome, false);
                    }
                } else {
                    display::print_info(&format!("Already in {}", mode.label()));
                }
            }
            Command::Clear => {
                controller.clear();
                display::print_view(&render(controller.session()));
            }
            Command::Health => {
                let report = controller.check_health().await;
                display::print_info(&format_health_status(&report));
            }
            Command::TopK(top_k) => match controller.set_top_k(top_k) {
                Ok(()) => display::print_info(&format!("Retrieving {} documents per question", top_k)),
                Err(err) => display::print_error(&err),
            },
            Command::Pdf => download_artifacts(&controller, &client).await,
            Command::Export(path) => export(&controller, path),
            Command::Transcribe(path) => {
                if blocked {
                    display::print_email_prompt(&controller.quota_status());
                    continue;
                }
                if let Some(question) = transcribe(&client, &path).await {
                    ask(&mut controller, &question).await;
                }
            }
            Command::History => display::print_view(&render(controller.session())),
            Command::Help => display::print_help(),
            Command::Invalid(message) => display::print_error(&RagchatError::validation(message)),
        }
    }

    Ok(())
}

/// Submits a question, echoing streamed text as it arrives.
async fn ask(controller: &mut ChatController, question: &str) {
    let streaming = controller.transport() == QueryTransport::Stream;
    let turn_start = controller.session().messages.len() + 1;
    let mut printed = 0usize;

    let result = controller
        .submit_with(question, |session| {
            if !streaming || session.messages.len() <= turn_start {
                return;
            }
            let Some(message) = session.last_message() else {
                return;
            };
            if message.error {
                return;
            }
            if printed == 0 {
                let badge = message.mode.map(|mode| mode.label()).unwrap_or("Assistant");
                println!("{}", format!("[{}]", badge).bright_magenta());
            }
            if let Some(delta) = message.content.get(printed..) {
                print!("{}", delta.bright_blue());
                let _ = std::io::stdout().flush();
                printed = message.content.len();
            }
        })
        .await;

    if printed > 0 {
        println!();
    }

    match result {
        Ok(SubmitOutcome::Ignored) => {}
        Ok(outcome) => {
            let view = render(controller.session());
            if let Some(reply) = view.messages.last() {
                let body_shown = printed > 0 && outcome == SubmitOutcome::Answered;
                display::print_message(reply, body_shown);
            }
            if let Some(quota) = &view.email_prompt {
                display::print_email_prompt(quota);
            }
        }
        Err(RagchatError::QuotaExceeded { .. }) => {
            display::print_email_prompt(&controller.quota_status());
        }
        Err(err) => display::print_error(&err),
    }
}

async fn download_artifacts(controller: &ChatController, client: &BackendClient) {
    let artifacts = controller.latest_artifacts();
    if artifacts.is_empty() {
        display::print_info("No PDF has been generated for this conversation yet.");
        return;
    }

    let tag = controller
        .session()
        .short_session_id()
        .unwrap_or_else(|| Local::now().format("%Y%m%d_%H%M%S").to_string());

    for artifact in artifacts {
        let file_name = match artifact.kind {
            ArtifactKind::Preparation => format!("preparation_plan_{tag}.pdf"),
            ArtifactKind::Summary => format!("conversation_summary_{tag}.pdf"),
        };
        match client.fetch_artifact(&artifact.path).await {
            Ok(Some(bytes)) => match std::fs::write(&file_name, &bytes) {
                Ok(()) => display::print_success(&format!("📄 Saved {}", file_name)),
                Err(err) => display::print_error(&err.into()),
            },
            Ok(None) => display::print_info("PDF is not ready yet. Please try again shortly."),
            Err(err) => display::print_error(&err),
        }
    }
}

fn export(controller: &ChatController, path: Option<String>) {
    let path = path.unwrap_or_else(|| {
        format!("chat_export_{}.md", Local::now().format("%Y%m%d_%H%M%S"))
    });
    match std::fs::write(&path, controller.export_markdown()) {
        Ok(()) => display::print_success(&format!("💾 Conversation saved to {}", path)),
        Err(err) => display::print_error(&err.into()),
    }
}

async fn transcribe(client: &BackendClient, path: &str) -> Option<String> {
    let audio = match std::fs::read(path) {
        Ok(audio) => audio,
        Err(err) => {
            display::print_error(&err.into());
            return None;
        }
    };
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio.wav".to_string());

    display::print_info("🎤 Transcribing...");
    match client.transcribe(&file_name, audio).await {
        Ok(text) => {
            display::print_info(&format!("🎤 \"{}\"", text));
            Some(text)
        }
        Err(err) => {
            display::print_error(&err);
            None
        }
    }
}
