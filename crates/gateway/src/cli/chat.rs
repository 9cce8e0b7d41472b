//! `serene chat`: interactive REPL command.
//!
//! Opens a readline loop that submits each line as an utterance and prints
//! the reply once the cycle ends.  A terminal observer draws the typing
//! indicator and the crisis banner.

use std::io::Write;
use std::sync::Arc;

use sr_domain::config::Config;
use sr_domain::{Message, OwnerId, Sender};
use sr_safety::{crisis_resources, CrisisSignal, EMERGENCY_GUIDANCE};

use crate::bootstrap;
use crate::runtime::{ConversationObserver, CycleOutcome, EraseError, Orchestrator, SubmitError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
pub async fn chat(config: Arc<Config>, session: String) -> anyhow::Result<()> {
    let orchestrator =
        bootstrap::build_orchestrator(&config)?.with_observer(Arc::new(TerminalObserver));
    let mut owner = OwnerId::new(session);

    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".serene")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // Stdout carries replies only.
    eprintln!("serene interactive chat");
    eprintln!("Session: {owner}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();
    print_transcript(&orchestrator, &owner).await;

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    match handle_slash_command(trimmed, &orchestrator, &mut owner).await {
                        SlashOutcome::Exit => break,
                        SlashOutcome::Continue => continue,
                    }
                }

                if let Err(e) = send_message(&orchestrator, &owner, trimmed).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Take care.");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum SlashOutcome {
    Continue,
    Exit,
}

async fn handle_slash_command(
    input: &str,
    orchestrator: &Orchestrator,
    owner: &mut OwnerId,
) -> SlashOutcome {
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, rest)) => (cmd, Some(rest.trim())),
        None => (input, None),
    };

    match cmd {
        "/exit" | "/quit" => return SlashOutcome::Exit,

        "/session" => {
            if let Some(name) = arg.filter(|s| !s.is_empty()) {
                *owner = OwnerId::new(name);
                eprintln!("Session switched to: {owner}");
                print_transcript(orchestrator, owner).await;
            } else {
                eprintln!("Current session: {owner}");
                eprintln!("Usage: /session <name>");
            }
        }

        "/history" => print_transcript(orchestrator, owner).await,

        "/resources" => print_crisis_resources(),

        "/erase" => match orchestrator.erase(owner).await {
            Ok(n) => eprintln!("Erased {n} message(s) for {owner}."),
            Err(EraseError::SessionBusy) => {
                eprintln!("\x1B[33mA reply is still on its way; try /erase again once it arrives.\x1B[0m")
            }
            Err(e) => eprintln!("\x1B[31merase failed: {e}\x1B[0m"),
        },

        "/clear" => {
            // Clear screen, cursor to top-left.
            eprint!("\x1B[2J\x1B[1;1H");
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /session <name>  Switch to another owner's transcript");
            eprintln!("  /history         Print the current transcript");
            eprintln!("  /resources       List crisis support resources");
            eprintln!("  /erase           Delete every message in this session");
            eprintln!("  /clear           Clear the screen");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    SlashOutcome::Continue
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message sending
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_message(orchestrator: &Orchestrator, owner: &OwnerId, text: &str) -> anyhow::Result<()> {
    let handle = match orchestrator.submit(owner, text).await {
        Ok(h) => h,
        Err(SubmitError::SessionBusy) => {
            eprintln!("(still replying to your last message)");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let outcome = handle
        .outcome()
        .await
        .ok_or_else(|| anyhow::anyhow!("cycle ended without an outcome"))?;

    match &outcome.reply {
        Some(reply) => {
            println!("serene> {}", reply.text);
            println!();
        }
        None => eprintln!("\x1B[31m(your reply could not be saved; please try again)\x1B[0m"),
    }
    Ok(())
}

async fn print_transcript(orchestrator: &Orchestrator, owner: &OwnerId) {
    match orchestrator.transcript(owner).await {
        Ok(messages) if messages.is_empty() => {}
        Ok(messages) => {
            for m in &messages {
                eprintln!("\x1B[2m{}\x1B[0m", format_line(m));
            }
            eprintln!();
        }
        Err(e) => eprintln!("\x1B[31mcould not load transcript: {e}\x1B[0m"),
    }
}

fn format_line(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "serene",
    };
    format!("{who}> {}", message.text)
}

fn print_crisis_resources() {
    eprintln!("\x1B[33m{EMERGENCY_GUIDANCE}\x1B[0m");
    for resource in crisis_resources() {
        eprintln!("\x1B[33m  {}\x1B[0m", resource.summary());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Terminal observer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Typing indicator and crisis banner on stderr.
struct TerminalObserver;

impl ConversationObserver for TerminalObserver {
    fn on_cycle_start(&self, _owner: &OwnerId, _user_message: &Message) {
        eprint!("\x1B[2mserene is typing...\x1B[0m");
        std::io::stderr().flush().ok();
    }

    fn on_escalation(&self, _owner: &OwnerId, _signal: &CrisisSignal) {
        eprintln!();
        eprintln!("\x1B[33mIt sounds like you are going through something really painful.\x1B[0m");
        print_crisis_resources();
    }

    fn on_cycle_end(&self, _owner: &OwnerId, _outcome: &CycleOutcome) {
        // Erase the typing indicator line.
        eprint!("\r\x1B[2K");
        std::io::stderr().flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_domain::CreatedAt;

    #[test]
    fn format_line_labels_sender() {
        let msg = Message {
            id: "m1".into(),
            owner: OwnerId::new("o"),
            sender: Sender::Assistant,
            text: "hello".into(),
            created_at: CreatedAt::Pending,
            seq: 0,
        };
        assert_eq!(format_line(&msg), "serene> hello");
    }
}
