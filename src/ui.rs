use colored::*;
use terminal_size::{Width, Height, terminal_size};

use crate::chat::message::Message;

fn rule() -> String {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    "─".repeat(width.0 as usize)
}

pub fn print_header(mode: &str, participants: &[&str]) {
    let line = rule();
    println!("{}", line.black().bold());

    let name = "Roundtable".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}", name, version);

    let info = format!("  {}  •  {}", mode, participants.join(", ")).cyan();
    println!("{}", info);

    println!("{}", line.black().bold());
}

pub fn print_reply(name: &str, content: &str) {
    println!("\n{}: {}", name.green().bold(), content);
}

pub fn print_tool(tool: &str, content: &str) {
    println!("\n{} {}", format!("[{}]", tool).magenta(), content.italic());
}

/// Print group messages the way the conversation shows them.
pub fn print_messages(messages: &[Message]) {
    for message in messages {
        match (&message.tool, &message.participant_name) {
            (Some(tool), _) => print_tool(tool, &message.content),
            (None, Some(name)) => print_reply(name, &message.content),
            _ => {}
        }
    }
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}
