//! CLI channel - interactive and single-message command line interface.

use std::io::{self, BufRead, Write};

use crate::chat::message::Message;
use crate::session::Session;
use crate::ui;
use crate::Result;

/// Which conversation the channel feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every participant answers privately from its own thread
    Private,
    /// One shared conversation run by the auto-speak policy
    Group,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Private => "private chat",
            Mode::Group => "group chat",
        }
    }
}

/// CLI channel over one session.
pub struct CliChannel {
    session: Session,
    mode: Mode,
}

impl CliChannel {
    pub fn new(session: Session, mode: Mode) -> Self {
        Self { session, mode }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a single message and print what it produced.
    pub async fn run_once(&mut self, message: &str) {
        ui::print_thinking("Waiting for replies");
        match self.mode {
            Mode::Private => {
                for reply in self.session.private_turn(message).await {
                    ui::print_reply(&reply.participant_name, &reply.content);
                }
            }
            Mode::Group => {
                let before = self.session.group().len();
                self.session.group_turn(message).await;
                ui::print_messages(&self.session.group().messages()[before..]);
            }
        }
    }

    /// Run a tool against the current group thread and print its output.
    pub async fn run_tool(&mut self, tool_id: &str) -> Vec<Message> {
        let before = self.session.group().len();
        let outcome = self.session.use_tool(tool_id).await;
        let added = self.session.group().messages()[before..].to_vec();
        ui::print_messages(&added);
        if !outcome.succeeded() {
            ui::print_warning(&format!("Tool '{}' did not complete", tool_id));
        }
        added
    }

    fn start_new_thread(&mut self) {
        let started = match self.mode {
            Mode::Private => self.session.new_private_threads() > 0,
            Mode::Group => self.session.new_group_thread(),
        };
        if started {
            ui::print_success("Started a new thread");
        } else {
            ui::print_warning("Current thread is still empty");
        }
    }

    /// Drop every thread of the current mode.
    pub fn clear_threads(&mut self) {
        match self.mode {
            Mode::Private => self.session.clear_private_threads(),
            Mode::Group => self.session.clear_group_threads(),
        }
        ui::print_success("Cleared all threads");
    }

    /// Make the 1-based group thread `index` current.
    fn switch_group_thread(&mut self, index: &str) {
        let threads = self.session.group_threads_mut();
        let result = index
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .map(|i| threads.switch(i));
        match result {
            Some(Ok(())) => ui::print_success(&format!("Switched to {}", threads.current().name)),
            Some(Err(e)) => ui::print_error(&e.to_string()),
            None => ui::print_warning("Usage: /switch <thread number>"),
        }
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("\n> ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
                println!("Goodbye! 👋");
                break;
            }

            if input == "/new" {
                self.start_new_thread();
                continue;
            }

            if input == "/clear" {
                self.clear_threads();
                continue;
            }

            if let Some(index) = input.strip_prefix("/switch ") {
                self.switch_group_thread(index.trim());
                continue;
            }

            if let Some(tool_id) = input.strip_prefix("/tool ") {
                if self.mode == Mode::Group {
                    self.run_tool(tool_id.trim()).await;
                } else {
                    ui::print_warning("Tools only run in group chat");
                }
                continue;
            }

            self.run_once(input).await;
        }

        Ok(())
    }
}
