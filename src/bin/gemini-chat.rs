//! Interactive chat application for conversing with Gemini.
//!
//! This binary provides a streaming REPL interface over the chat controller.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage; the key is read from API_KEY
//! gemini-chat
//!
//! # Specify a model
//! gemini-chat --model gemini-2.0-flash
//!
//! # Keep an HTML rendering of the chat up to date
//! gemini-chat --html chat.html
//!
//! # Disable colors (useful for piping output)
//! gemini-chat --no-color
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/transcript [json]` - Print the conversation
//! - `/html <file>` - Render the conversation to HTML
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::fs;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use gemini_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, ChatView, HtmlSnapshot, Rejection,
    SubmitOutcome, TerminalView, help_text, parse_command, render_page,
};
use gemini_chat::{ReplySession, Sender};

/// Main entry point for the gemini-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("gemini-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let mut controller = ChatController::initialize(&config);
    let mut views = (
        TerminalView::with_color(config.use_color),
        config.html_path.clone().map(HtmlSnapshot::new),
    );
    let mut rl = DefaultEditor::new()?;

    println!("Gemini Chat (model: {})", config.model);
    println!("Type /help for commands, /quit to exit\n");
    views.0.print_transcript(&controller.view_state());
    views.error_changed(&controller.view_state());

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.trim());

                // Check for slash commands
                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Stats => print_stats(&controller),
                        ChatCommand::ShowConfig => print_config(&config),
                        ChatCommand::Transcript { json: false } => {
                            views.0.print_transcript(&controller.view_state());
                        }
                        ChatCommand::Transcript { json: true } => {
                            match serde_json::to_string_pretty(controller.transcript()) {
                                Ok(json) => println!("{json}"),
                                Err(err) => views
                                    .0
                                    .print_error(&format!("Failed to encode transcript: {err}")),
                            }
                        }
                        ChatCommand::Html(path) => {
                            match fs::write(&path, render_page(&controller.view_state())) {
                                Ok(()) => views.0.print_info(&format!("Chat rendered to {path}")),
                                Err(err) => views
                                    .0
                                    .print_error(&format!("Failed to write {path}: {err}")),
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            views.0.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the model
                controller.set_input(line);
                match controller.submit(&mut views).await {
                    SubmitOutcome::Rejected(Rejection::SessionUnavailable) => {
                        views.0.print_error(
                            "The chat session is unavailable; restart with a valid API key.",
                        );
                    }
                    SubmitOutcome::Rejected(_)
                    | SubmitOutcome::Completed { .. }
                    | SubmitOutcome::Failed { .. } => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                views.0.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats<S: ReplySession>(controller: &ChatController<S>) {
    let transcript = controller.transcript();
    println!("    Session Statistics:");
    println!(
        "      Session: {}",
        if controller.has_session() {
            "connected"
        } else {
            "unavailable"
        }
    );
    println!("      Messages: {}", transcript.len());
    println!("        user: {}", transcript.count(Sender::User));
    println!("        ai: {}", transcript.count(Sender::Ai));
    println!("        error: {}", transcript.count(Sender::Error));
    match controller.last_error() {
        Some(error) => println!("      Last error: {error}"),
        None => println!("      Last error: (none)"),
    }
}

fn print_config(config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      System instruction: {}", config.system_instruction);
    println!("      API key variable: {}", config.api_key_env);
    println!(
        "      Base URL: {}",
        config.base_url.as_deref().unwrap_or("(default)")
    );
    match config.timeout {
        Some(timeout) => println!("      Timeout: {}s", timeout.as_secs()),
        None => println!("      Timeout: (none)"),
    }
    println!(
        "      Temperature: {}",
        describe(config.generation.temperature)
    );
    println!(
        "      Max output tokens: {}",
        describe(config.generation.max_output_tokens)
    );
    match config.html_path {
        Some(ref path) => println!("      HTML snapshot: {}", path.display()),
        None => println!("      HTML snapshot: (disabled)"),
    }
}

fn describe<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}
