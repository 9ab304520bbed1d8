use clap::{Parser, Subcommand, ValueEnum};
use pickset_client::{ClientConfig, PickerClient};
use pickset_core::Scope;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Command line access to a running `pickset-server`.
#[derive(Parser, Debug)]
#[command(name = "pickset", version, about = "Browse, add and select ids on a pickset server")]
struct Cli {
    /// Base URL of the server.
    ///
    /// Environment variable: `PICKSET_URL`
    #[arg(long, env = "PICKSET_URL", default_value_t = ClientConfig::default().base_url)]
    url: String,

    /// Ids per page.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = ClientConfig::default().page_size)]
    page_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one page of available or selected ids.
    Items {
        #[arg(long, value_enum, default_value_t = ScopeArg::Available)]
        scope: ScopeArg,
        /// Keep only ids whose decimal form contains this text.
        #[arg(long, default_value = "")]
        filter: String,
        /// Zero-based page number.
        #[arg(long, default_value_t = 0)]
        page: usize,
    },
    /// Add custom ids outside the base range.
    Add {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print the full ordered selection.
    Selection,
    /// Replace the selection with the given ids, in order.
    Select { ids: Vec<u64> },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Available,
    Selected,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Available => Scope::Available,
            ScopeArg::Selected => Scope::Selected,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let client = PickerClient::connect(&ClientConfig {
        base_url: cli.url,
        page_size: cli.page_size,
        ..ClientConfig::default()
    })?;
    tracing::debug!(command = ?cli.command, "Sending request");

    match cli.command {
        Command::Items {
            scope,
            filter,
            page,
        } => print(&*client.page(scope.into(), page, &filter).await?),
        Command::Add { ids } => print(&client.add(ids).await?),
        Command::Selection => print(&client.full_selection().await?),
        Command::Select { ids } => print(&client.save_selection(ids).await?),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
