//! Roundtable CLI entry point

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use anyhow::Result;

use roundtable::cli::{CliChannel, Mode};
use roundtable::{config, ui, Session};

#[derive(Parser)]
#[command(name = "roundtable")]
#[command(about = "Roundtable - chat with many models, alone or together")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration
    Init,

    /// Chat privately with every enabled participant
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Talk to the whole group
    Group {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Send a message to the group, then run a tool on the result
    Tool {
        /// Tool id
        id: String,

        /// Group message to start from
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List supported engines
    Engines,

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = config::init()?;
            ui::print_success(&format!("Wrote {}", path.display()));
            println!("\nNext steps:");
            println!("  1. Add participants and API keys to {}", path.display());
            println!("  2. Chat: roundtable group -m \"Hello!\"");
        }

        Commands::Chat { message } => run_channel(Mode::Private, message).await?,

        Commands::Group { message } => run_channel(Mode::Group, message).await?,

        Commands::Tool { id, message } => {
            let mut channel = CliChannel::new(Session::new(config::load()?), Mode::Group);
            if let Some(msg) = message {
                channel.run_once(&msg).await;
            }
            channel.run_tool(&id).await;
        }

        Commands::Engines => {
            let config = config::load().unwrap_or_default();
            let session = Session::new(config);
            for engine in session.providers().engines() {
                println!("{}", engine);
            }
        }

        Commands::Status => {
            let config = config::load()?;
            let session = Session::new(config);
            let config = session.config();
            println!("Roundtable Status\n");
            println!("Config: {}", config::config_path().display());

            for participant in &config.participants {
                let state = if !participant.enable {
                    "disabled"
                } else if session.providers().has(&participant.engine) {
                    "✓"
                } else {
                    "unsupported engine"
                };
                println!(
                    "  {} ({} / {}): {}",
                    participant.display_name(),
                    participant.engine,
                    participant.model,
                    state
                );
            }

            let tools = session.tools().tool_ids();
            println!("Tools: {}", if tools.is_empty() { "none".to_string() } else { tools.join(", ") });
            println!(
                "Auto speak: {}  •  All speak: {}  •  Parallel: {}",
                config.conversation.auto_speak,
                config.conversation.all_speak,
                config.conversation.parallel_dispatch
            );
        }
    }

    Ok(())
}

async fn run_channel(mode: Mode, message: Option<String>) -> Result<()> {
    let config = match config::load() {
        Ok(config) => config,
        Err(e) => {
            ui::print_error(&e.to_string());
            return Err(e.into());
        }
    };
    if config.enabled_participants().is_empty() {
        ui::print_warning("No enabled participants in the configuration");
    }
    let names: Vec<String> = config
        .enabled_participants()
        .iter()
        .map(|p| p.display_name().to_string())
        .collect();

    let mut channel = CliChannel::new(Session::new(config), mode);

    if let Some(msg) = message {
        // Single message mode
        channel.run_once(&msg).await;
    } else {
        let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        ui::print_header(mode.label(), &names);
        ui::print_step("Type /new for a new thread, /switch <n> to change threads, /clear to start over, exit to quit");
        channel.run_interactive().await?;
    }

    Ok(())
}
