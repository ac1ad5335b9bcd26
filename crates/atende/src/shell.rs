// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atende shell` command implementation.
//!
//! Runs the full engine against a console transport. Each typed line is an
//! event of one device and one contact chat:
//!
//! - `text` is a message from the contact
//! - `> text` is a message typed by the device owner (human agent)
//! - `/photo PATH [caption]` is a contact photo
//! - `/quote text` is an agent message quoting the last photo
//! - `/quit` exits

use std::sync::Arc;

use atende_agent::Dispatcher;
use atende_agent::shutdown;
use atende_config::AtendeConfig;
use atende_core::AtendeError;
use atende_core::types::InboundMessage;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{error, info};

use crate::app;
use crate::console::ConsoleChannel;

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Contact(String),
    Agent(String),
    Photo { path: String, caption: String },
    Quote(String),
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> ShellInput {
    let line = line.trim();
    if line.is_empty() {
        return ShellInput::Empty;
    }
    if line == "/quit" || line == "/exit" {
        return ShellInput::Quit;
    }
    if let Some(rest) = line.strip_prefix("/photo") {
        let rest = rest.trim();
        let (path, caption) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return ShellInput::Photo {
            path: path.to_string(),
            caption: caption.trim().to_string(),
        };
    }
    if let Some(rest) = line.strip_prefix("/quote") {
        return ShellInput::Quote(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix('>') {
        return ShellInput::Agent(rest.trim().to_string());
    }
    ShellInput::Contact(line.to_string())
}

/// Runs the `atende shell` REPL for `device` talking to `contact`.
pub async fn run_shell(
    config: AtendeConfig,
    device: String,
    contact: String,
) -> Result<(), AtendeError> {
    let channel = Arc::new(ConsoleChannel::new());
    let runtime = app::build_runtime(&config, channel.clone()).await?;
    let cancel = shutdown::install_signal_handler();

    let followups = runtime.spawn_followups(cancel.clone());
    let dispatcher = Dispatcher::new(channel.clone(), Arc::clone(&runtime.ctx));
    let dispatch = tokio::spawn(dispatcher.run(cancel.clone()));

    let chat = format!("{}@c.us", contact.trim_start_matches('+'));
    info!(device = %device, chat = %chat, "shell session started");

    let mut rl = DefaultEditor::new()
        .map_err(|e| AtendeError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("atende shell ({device})").bold().green());
    println!(
        "Plain lines come from the contact, {} lines from the agent. {} to exit.\n",
        ">".yellow(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", contact.cyan());
    let mut last_photo: Option<String> = None;
    let mut seq: u64 = 0;
    loop {
        // Readline blocks; the dispatcher keeps running on the other workers.
        let line = tokio::task::block_in_place(|| rl.readline(&prompt));
        if cancel.is_cancelled() {
            break;
        }
        match line {
            Ok(line) => {
                let input = parse_line(&line);
                if input == ShellInput::Empty {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                seq += 1;
                let id = format!("shell-{seq}");

                let msg = match input {
                    ShellInput::Quit => break,
                    ShellInput::Empty => continue,
                    ShellInput::Contact(body) => {
                        InboundMessage::text(&device, &chat, &body).with_id(&id)
                    }
                    ShellInput::Agent(body) => InboundMessage::text(&device, &chat, &body)
                        .with_id(&id)
                        .from_self(),
                    ShellInput::Photo { path, caption } => {
                        last_photo = Some(id.clone());
                        InboundMessage::text(&device, &chat, &caption)
                            .with_id(&id)
                            .with_media(&path)
                    }
                    ShellInput::Quote(body) => {
                        let Some(photo) = &last_photo else {
                            eprintln!("{}", "no photo to quote yet".yellow());
                            continue;
                        };
                        InboundMessage::text(&device, &chat, &body)
                            .with_id(&id)
                            .with_quote(photo)
                            .from_self()
                    }
                };
                if let Err(e) = channel.push(msg) {
                    eprintln!("{}: {e}", "error".red());
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    cancel.cancel();
    match dispatch.await {
        Ok(Err(e)) => error!(error = %e, "dispatcher failed"),
        Err(e) => error!(error = %e, "dispatcher task panicked"),
        Ok(Ok(())) => {}
    }
    if let Some(handle) = followups {
        let _ = handle.await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_come_from_the_contact() {
        assert_eq!(parse_line("  oi  "), ShellInput::Contact("oi".into()));
    }

    #[test]
    fn angle_bracket_lines_come_from_the_agent() {
        assert_eq!(parse_line("> #ibo"), ShellInput::Agent("#ibo".into()));
    }

    #[test]
    fn photo_takes_a_path_and_optional_caption() {
        assert_eq!(
            parse_line("/photo /tmp/tv.png meu print"),
            ShellInput::Photo {
                path: "/tmp/tv.png".into(),
                caption: "meu print".into()
            }
        );
        assert_eq!(
            parse_line("/photo /tmp/tv.png"),
            ShellInput::Photo {
                path: "/tmp/tv.png".into(),
                caption: String::new()
            }
        );
    }

    #[test]
    fn quote_and_quit() {
        assert_eq!(parse_line("/quote #ibo"), ShellInput::Quote("#ibo".into()));
        assert_eq!(parse_line("/quit"), ShellInput::Quit);
        assert_eq!(parse_line("   "), ShellInput::Empty);
    }
}
