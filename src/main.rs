//! Srishti CLI
//!
//! Plain-text REPL over the dialogue orchestrator.

use clap::Parser;
use srishti::auth::{self, AuthPolicy, ConfigKeySelector};
use srishti::commands::{self, ParsedCommand, SlashCommand};
use srishti::memory::Message;
use srishti::{config, GeminiClient, Orchestrator, Refusal, RelayLog, SendOutcome};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LIST_COUNT: usize = 10;

/// Srishti - Dual-Brain assistant in the terminal
#[derive(Parser, Debug)]
#[command(name = "srishti")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding config.toml (default: $SRISHTI_HOME or ~/.srishti)
    #[arg(long)]
    home: Option<PathBuf>,

    /// Model for dialogue replies
    #[arg(long)]
    model: Option<String>,

    /// Model for memory extraction
    #[arg(long)]
    memory_model: Option<String>,

    /// Verbose output: debug-level diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Start with background memory extraction off
    #[arg(long)]
    no_auto_learn: bool,

    /// Fail startup if no API key can be selected
    #[arg(long)]
    strict_auth: bool,

    /// First message to send
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let home = match cli.home.clone() {
        Some(home) => home,
        None => config::default_home()?,
    };
    info!("Srishti home: {:?}", home);

    let mut config = config::load(&home).await?;
    if let Some(model) = cli.model.clone() {
        config = config.with_model(model);
    }
    if let Some(model) = cli.memory_model.clone() {
        config = config.with_memory_model(model);
    }
    if cli.no_auto_learn {
        config = config.with_auto_learning(false);
    }
    if cli.strict_auth {
        config = config.with_strict_auth(true);
    }

    let relay = Arc::new(RwLock::new(RelayLog::new()));
    let selector = ConfigKeySelector::new(&config);
    auth::authorize(&selector, AuthPolicy::from_config(&config), &relay).await?;
    let config = config.with_api_key(selector.selected_key());

    let generator = Arc::new(GeminiClient::new(&config));
    let orchestrator = Orchestrator::new(generator, &config).with_relay(relay);

    run_repl(cli, &orchestrator).await?;

    orchestrator.wait_for_extractions().await;
    Ok(())
}

async fn run_repl(cli: Cli, orchestrator: &Orchestrator) -> anyhow::Result<()> {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

    // Blocking stdin reader
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    println!("SRISHTI online. Type /help for commands.");

    if !cli.prompt.is_empty() {
        let prompt_text = cli.prompt.join(" ");
        send_and_print(orchestrator, &prompt_text).await;
    }

    prompt()?;
    while let Some(line) = line_rx.recv().await {
        match commands::parse_command(&line) {
            Some(ParsedCommand::Command(SlashCommand::Quit, _)) => break,
            Some(ParsedCommand::Command(cmd, args)) => run_command(orchestrator, cmd, &args).await,
            Some(ParsedCommand::Unknown(name)) => {
                println!("Unknown command /{}. Type /help for commands.", name)
            }
            None => send_and_print(orchestrator, &line).await,
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

async fn send_and_print(orchestrator: &Orchestrator, input: &str) {
    match orchestrator.send(input).await {
        SendOutcome::Replied(message) => print_reply(&message, orchestrator).await,
        SendOutcome::Refused(Refusal::EmptyInput) => {}
        SendOutcome::Refused(Refusal::KillSwitched) => {
            println!("CORE_HALTED: kill switch engaged. Use /kill to reboot the link.")
        }
        SendOutcome::Refused(Refusal::Busy) => println!("Still thinking, try again shortly."),
        SendOutcome::Disrupted(reason) => {
            error!("Dialogue failed: {}", reason);
            println!("Neural link disruption detected. Your message was not answered.");
        }
        SendOutcome::Discarded => println!("(reply dropped: conversation was cleared)"),
    }
}

async fn print_reply(message: &Message, orchestrator: &Orchestrator) {
    let balance = orchestrator.session_snapshot().await.logic_balance();
    let mode = message
        .personality
        .map(|p| p.to_string())
        .unwrap_or_default();

    println!();
    println!("[{} | logic {:.0}]", mode, balance);
    println!("{}", message.text);

    if let Some(reasoning) = &message.reasoning {
        println!();
        if !reasoning.logical_path.is_empty() {
            println!("  logic:    {}", reasoning.logical_path);
        }
        if !reasoning.emotional_context.is_empty() {
            println!("  emotion:  {}", reasoning.emotional_context);
        }
        if let Some(conclusion) = &reasoning.mediator_conclusion {
            println!("  mediator: {}", conclusion);
        }
    }

    if !message.simulations.is_empty() {
        println!();
        println!("  Future simulations:");
        for path in &message.simulations {
            println!(
                "  - {} (risk {:.0}, reward {:.0}, stress {:.0}): {}",
                path.label, path.risk_score, path.reward_score, path.stress_impact, path.description
            );
            if let Some(rec) = &path.recommendation {
                println!("      -> {}", rec);
            }
        }
    }
    println!();
}

async fn run_command(orchestrator: &Orchestrator, cmd: SlashCommand, args: &str) {
    match cmd {
        SlashCommand::Help => println!("{}", SlashCommand::help_text()),
        SlashCommand::Kill => {
            if orchestrator.toggle_kill_switch().await {
                println!("EMERGENCY_KILL_PROTOCOL engaged. New messages are refused.");
            } else {
                println!("Neural link rebooted.");
            }
        }
        SlashCommand::Learn => {
            let enabled = !orchestrator.session_snapshot().await.is_auto_learning();
            orchestrator.set_auto_learning(enabled).await;
            println!("Auto-learning {}.", if enabled { "on" } else { "off" });
        }
        SlashCommand::Memories => {
            let memories = orchestrator
                .memories(commands::count_arg(args, DEFAULT_LIST_COUNT))
                .await;
            if memories.is_empty() {
                println!("No memories yet.");
            }
            for item in memories {
                println!("  {}", item.digest_line());
            }
        }
        SlashCommand::Logs => {
            let entries = orchestrator
                .relay_entries(commands::count_arg(args, DEFAULT_LIST_COUNT))
                .await;
            if entries.is_empty() {
                println!("Relay log is empty.");
            }
            for entry in entries {
                println!(
                    "  {} [{}] {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.kind,
                    entry.content
                );
            }
        }
        SlashCommand::Status => {
            let session = orchestrator.session_snapshot().await;
            let messages = orchestrator.conversation().read().await.len();
            let store = orchestrator.memory();
            let memory = store.read().await;
            println!("  mode:          {}", session.personality_mode());
            println!("  logic balance: {:.0}", session.logic_balance());
            println!("  kill switch:   {}", on_off(session.is_kill_switched()));
            println!("  auto-learning: {}", on_off(session.is_auto_learning()));
            println!("  messages:      {}", messages);
            println!("  memories:      {}/{}", memory.len(), memory.capacity());
            for (level, count) in memory.level_counts() {
                println!("    {:<13} {}", level.as_str(), count);
            }
        }
        SlashCommand::Clear => {
            orchestrator.reset().await;
            println!("Conversation cleared. Memories kept.");
        }
        SlashCommand::Quit => {}
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
