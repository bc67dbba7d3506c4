//! Terminal output for rendered views.

use colored::Colorize;
use ragchat_application::view::{Header, MessageView, View};
use ragchat_core::RagchatError;
use ragchat_core::format::format_error_message;
use ragchat_core::session::{MessageRole, QuotaStatus};

pub fn print_banner(title: &str, description: &str) {
    println!("{}", format!("=== {} ===", title).bright_magenta().bold());
    println!("{}", description.bright_black());
    println!(
        "{}",
        "Ask a question, type '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();
}

pub fn print_header(header: &Header) {
    let mut parts = vec![header.mode_label.bright_cyan().to_string()];
    parts.push(format!("top_k {}", header.top_k));
    match header.remaining_queries {
        Some(remaining) => parts.push(format!("{} free questions left", remaining)),
        None => {
            if let Some(email) = &header.user_email {
                parts.push(format!("📧 {}", email));
            }
        }
    }
    match &header.session {
        Some(id) => parts.push(format!("🔗 Session {}", id)),
        None => parts.push("🆕 New session".to_string()),
    }
    println!("{}", parts.join(" | ").bright_black());
}

pub fn print_view(view: &View) {
    print_header(&view.header);
    println!();
    for message in &view.messages {
        print_message(message, false);
    }
    if let Some(quota) = &view.email_prompt {
        print_email_prompt(quota);
    }
}

/// Prints one message. With `body_shown` the content was already streamed
/// to the terminal and only the trailing panels are printed.
pub fn print_message(message: &MessageView, body_shown: bool) {
    if !body_shown {
        match message.role {
            MessageRole::User => {
                println!("{}", format!("> {}", message.content).green());
            }
            MessageRole::Assistant => {
                let badge = message.badge.unwrap_or("Assistant");
                println!(
                    "{}",
                    format!("[{}] {}", badge, message.timestamp).bright_magenta()
                );
                for line in message.content.lines() {
                    if message.error {
                        println!("{}", line.red());
                    } else {
                        println!("{}", line.bright_blue());
                    }
                }
            }
        }
    }

    if let Some(stats) = &message.stats {
        println!("{}", stats.bright_black());
    }

    if let Some(panel) = &message.sources {
        println!(
            "{}",
            format!(
                "📚 Sources ({} documents searched)",
                panel.document_count
            )
            .yellow()
        );
        for entry in &panel.entries {
            println!("{}", format!("  {}. {}", entry.index, entry.name).yellow());
            if let Some(excerpt) = &entry.excerpt {
                for line in excerpt.lines() {
                    println!("     {}", line.bright_black());
                }
            }
        }
    }

    for link in &message.downloads {
        println!("{}", format!("{} (/pdf)", link.label).cyan());
    }

    if message.role == MessageRole::Assistant {
        println!();
    }
}

pub fn print_email_prompt(quota: &QuotaStatus) {
    println!(
        "{}",
        format!(
            "📧 You've used {}/{} free questions. Enter your email address to continue.",
            quota.used, quota.limit
        )
        .bright_yellow()
    );
}

pub fn print_info(text: &str) {
    println!("{}", text.bright_black());
}

pub fn print_success(text: &str) {
    println!("{}", text.bright_green());
}

pub fn print_error(err: &RagchatError) {
    let text = match err {
        RagchatError::Validation(message) => message.clone(),
        _ => format_error_message(err.kind(), &err.to_string()),
    };
    for line in text.lines() {
        eprintln!("{}", line.red());
    }
}

pub fn print_help() {
    let rows = [
        ("/mode [knowledge|preparation]", "Show or switch the query mode"),
        ("/clear", "Start a new conversation"),
        ("/health", "Check the backend status"),
        ("/email <address>", "Unlock unlimited questions"),
        ("/topk <n>", "Documents retrieved per question"),
        ("/pdf", "Download PDFs generated for this session"),
        ("/export [file]", "Save the conversation as Markdown"),
        ("/transcribe <audio file>", "Ask a question from a voice recording"),
        ("/history", "Reprint the conversation"),
        ("quit", "Exit"),
    ];
    for (command, description) in rows {
        println!(
            "  {} {}",
            format!("{:<30}", command).bright_cyan(),
            description.bright_black()
        );
    }
}
