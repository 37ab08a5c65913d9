mod commands;
mod prompt;
mod steps;
mod wizard;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "telefwd",
    about = "telefwd — mirror one Telegram chat into another"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Custom config directory (overrides default ~/.config/telefwd/).
    #[arg(long, global = true, env = "TELEFWD_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,

    /// Custom data directory (session artifact location).
    #[arg(long, global = true, env = "TELEFWD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive forwarding wizard (default when no subcommand).
    Run,
    /// List all chats visible to the logged-in account.
    Chats,
    /// Delete every message in a chat. Irreversible.
    Clear {
        /// Chat id, as shown by `telefwd chats`.
        #[arg(long)]
        chat: i64,
        /// Skip the confirmation prompt.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Sign out, delete the session artifact, and clear stored credentials.
    Logout,
}

fn init_telemetry(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Logs go to stderr so they don't interleave with wizard prompts.
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli.log_level);

    if let Some(dir) = cli.config_dir {
        telefwd_config::set_config_dir(dir);
    }
    if let Some(dir) = cli.data_dir {
        telefwd_config::set_data_dir(dir);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "telefwd starting");

    match cli.command {
        None | Some(Commands::Run) => wizard::run_wizard().await,
        Some(Commands::Chats) => commands::handle_chats().await,
        Some(Commands::Clear { chat, yes }) => commands::handle_clear(chat, yes).await,
        Some(Commands::Logout) => commands::handle_logout().await,
    }
}
