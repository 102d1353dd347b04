use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dispatch::catalog::{missing_models, MODEL_ALIASES};
use dispatch::{ChatOptions, Dispatcher};
use shared::agent_api::{ConversationTurn, ImageAttachment};
use shared::settings::{BackendPreference, DispatchSettings};
use shared::{DispatchError, DispatchResult, ResultSource};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod utils;

#[derive(Parser)]
#[command(name = "legion")]
#[command(about = "Chat with the Legion personas through a local Ollama server", long_about = None)]
struct Cli {
    /// Ollama base URL (overrides settings and OLLAMA_URL)
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Which backend answers chat requests
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendArg>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Local,
    Bridge,
    Auto,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Local => BackendPreference::Local,
            BackendArg::Bridge => BackendPreference::Bridge,
            BackendArg::Auto => BackendPreference::Auto,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the available personas
    Personas {
        #[arg(long)]
        json: bool,
    },
    /// Send one message to a persona
    Chat {
        /// Persona id (defaults to the configured default persona)
        #[arg(short, long)]
        persona: Option<String>,

        /// Image to attach to the message
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Report backend failures instead of answering with a simulated response
        #[arg(long)]
        no_fallback: bool,

        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Check whether the local Ollama server is reachable
    Status,
    /// Show hosted model aliases and which persona models are not installed
    Models,
    /// Print the settings file location and effective settings
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        save: bool,
    },
}

fn effective_settings(cli: &Cli) -> DispatchSettings {
    let mut settings = utils::load_settings_or_default();
    if let Some(url) = &cli.ollama_url {
        settings.ollama_base_url = url.clone();
    }
    if let Some(backend) = cli.backend {
        settings.backend = backend.into();
    }
    settings
}

fn print_result(result: &DispatchResult) {
    println!("{}", result.content);
    println!();
    println!("-- {}", result.attribution());
    if result.source == ResultSource::Fallback {
        if let Some(note) = &result.note {
            println!("-- {}", note);
        }
    }
}

async fn run_chat(
    dispatcher: &Dispatcher,
    persona: &str,
    turn: ConversationTurn,
    options: ChatOptions,
    json: bool,
) -> Result<()> {
    match dispatcher.chat(&[turn], persona, options).await {
        Ok(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
        Ok(result) => print_result(&result),
        Err(DispatchError::Cancelled) => eprintln!("Cancelled."),
        Err(e @ DispatchError::UnknownPersona { .. }) => {
            let ids: Vec<&str> = dispatcher
                .list_personas()
                .iter()
                .map(|p| p.id.as_str())
                .collect();
            return Err(e).with_context(|| format!("available personas: {}", ids.join(", ")));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = effective_settings(&cli);

    match cli.command {
        Command::Personas { json } => {
            let dispatcher = Dispatcher::new(settings)?;
            if json {
                println!("{}", serde_json::to_string_pretty(dispatcher.list_personas())?);
            } else {
                for persona in dispatcher.list_personas() {
                    println!(
                        "{:<18} {:<28} {:<20} {}",
                        persona.id, persona.display_name, persona.backend_model, persona.description
                    );
                }
            }
        }
        Command::Chat {
            persona,
            image,
            no_fallback,
            timeout_ms,
            json,
            message,
        } => {
            let persona = persona.unwrap_or_else(|| settings.default_persona.clone());
            let mut turn = ConversationTurn::user(message.join(" "));
            if let Some(path) = image {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("reading image {}", path.display()))?;
                turn = turn.with_image(ImageAttachment::Bytes(bytes));
            }

            let token = CancellationToken::new();
            let mut options = ChatOptions::default().with_cancel(token.clone());
            if no_fallback {
                options = options.with_fallback(false);
            }
            if let Some(ms) = timeout_ms {
                options = options.with_timeout(Duration::from_millis(ms));
            }

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            });

            let dispatcher = Dispatcher::new(settings)?;
            run_chat(&dispatcher, &persona, turn, options, json).await?;
        }
        Command::Status => {
            let dispatcher = Dispatcher::new(settings)?;
            let status = dispatcher.backend_status().await;
            if status.available {
                println!("Ollama online at {} ({} models)", status.url, status.models.len());
                for model in &status.models {
                    println!("  {}", model);
                }
            } else {
                println!("Ollama offline at {}", status.url);
                if let Some(error) = &status.error {
                    println!("  {}", error);
                }
                if dispatcher.settings().fallback_enabled {
                    println!("  Simulated responses active");
                }
            }
        }
        Command::Models => {
            let dispatcher = Dispatcher::new(settings)?;
            println!("Hosted model aliases:");
            for alias in MODEL_ALIASES {
                println!(
                    "  {:<20} -> {:<20} {}",
                    alias.alias, alias.local_model, alias.description
                );
            }

            let status = dispatcher.backend_status().await;
            if status.available {
                let wanted = dispatcher
                    .list_personas()
                    .iter()
                    .map(|p| p.backend_model.as_str());
                let missing = missing_models(wanted, &status.models);
                if missing.is_empty() {
                    println!("All persona models are installed.");
                } else {
                    println!("Persona models not installed (ollama pull <model>):");
                    for model in missing {
                        println!("  {}", model);
                    }
                }
            }
        }
        Command::Config { save } => {
            let path = utils::config_path().context("no config directory on this platform")?;
            println!("Settings file: {}", path.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if save {
                utils::save_settings_to(&path, &settings)?;
                println!("Saved.");
            }
        }
    }

    Ok(())
}
