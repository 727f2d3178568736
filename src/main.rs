use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wesley_chat::completion::HttpCompletionClient;
use wesley_chat::settings::SqliteKvStore;
use wesley_chat::terminal::{self, TerminalView};
use wesley_chat::{ChatOrchestrator, ClientConfig, RelayConfig, RelayServer, SettingsStore};

/// Wesley - voice-enabled chat client and completion relay
#[derive(Parser)]
#[command(name = "wesley", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server (default)
    Relay {
        /// Port to listen on
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Chat from the terminal
    Chat {
        /// Relay endpoint to send messages to
        #[arg(long, env = "WESLEY_RELAY_URL", conflicts_with = "direct")]
        relay_url: Option<String>,

        /// Call the upstream API directly with the API key from settings
        #[arg(long)]
        direct: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,wesley_chat=info",
        1 => "info,wesley_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Relay { port: None }) {
        Command::Relay { port } => run_relay(port).await,
        Command::Chat { relay_url, direct } => run_chat(relay_url, direct).await,
    }
}

async fn run_relay(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = RelayConfig::load();
    if let Some(port) = port {
        config.port = port;
    }

    tracing::info!(port = config.port, model = %config.model, "starting relay");
    RelayServer::new(config).run().await?;
    Ok(())
}

async fn run_chat(relay_url: Option<String>, direct: bool) -> anyhow::Result<()> {
    let config = ClientConfig::load(relay_url, direct);
    tracing::debug!(?config, "loaded client configuration");

    let settings_store = match open_settings(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "settings database unavailable, using in-memory settings");
            SettingsStore::in_memory()
        }
    };

    let view = Arc::new(TerminalView::new(config.persona.name.clone()));
    let client = Arc::new(HttpCompletionClient::new(config.endpoint));

    let orchestrator = ChatOrchestrator::builder(client, view)
        .persona(config.persona)
        .settings_store(settings_store)
        .build();

    terminal::run(Arc::new(orchestrator)).await
}

fn open_settings(config: &ClientConfig) -> anyhow::Result<SettingsStore> {
    std::fs::create_dir_all(&config.data_dir)?;
    let kv = SqliteKvStore::open(config.settings_db_path())?;
    Ok(SettingsStore::new(Arc::new(kv)))
}
