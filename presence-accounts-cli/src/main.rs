//! Command-line entry point for the presence account store
//!
//! Loads every configured backend, runs one command against the account
//! cache and commits whatever the command changed.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use presence_accounts_app::{AppStateBuilder, StorageConfig, ENV_CONFIG};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "presence-accounts", version, about = "Inspect and edit stored presence accounts")]
struct Cli {
    /// JSON storage configuration
    #[arg(long, global = true, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List accounts that have at least one attribute
    List,
    /// Print an account's attributes and parameters as JSON
    Show { account: String },
    /// Print one value in its escaped form
    Get {
        account: String,
        /// Attribute name, or `param-<name>` for a parameter
        key: String,
        /// D-Bus signature to convert the value to, e.g. `u` or `as`
        #[arg(long = "type", value_name = "SIG")]
        ty: Option<String>,
    },
    /// Store one value given in its escaped form
    Set {
        account: String,
        key: String,
        value: String,
        #[arg(long = "type", value_name = "SIG")]
        ty: Option<String>,
        /// Mark the parameter as a credential
        #[arg(long)]
        secret: bool,
    },
    /// Remove one value
    Unset { account: String, key: String },
    /// List every flat key stored for an account
    Keys { account: String },
    /// Create an account
    Create {
        manager: String,
        protocol: String,
        /// Provider id of the backend that must store the account
        #[arg(long)]
        provider: Option<String>,
        /// Connection parameter, repeatable
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
    /// Delete an account from its backend
    Delete { account: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match cli.config {
        Some(path) => StorageConfig::load(&path).await?,
        None => StorageConfig::default(),
    };
    tracing::debug!("Key-file at {}", config.keyfile_path.display());

    let mut state = AppStateBuilder::new(config).build()?;
    state.run_startup().await?;
    let storage = &mut state.storage;

    match cli.command {
        Command::List => commands::list(storage),
        Command::Show { account } => commands::show(storage, &account),
        Command::Get { account, key, ty } => commands::get(storage, &account, &key, ty.as_deref()),
        Command::Set {
            account,
            key,
            value,
            ty,
            secret,
        } => commands::set(storage, &account, &key, &value, ty.as_deref(), secret).await,
        Command::Unset { account, key } => commands::unset(storage, &account, &key).await,
        Command::Keys { account } => commands::keys(storage, &account),
        Command::Create {
            manager,
            protocol,
            provider,
            params,
        } => commands::create(storage, provider.as_deref(), &manager, &protocol, &params).await,
        Command::Delete { account } => commands::delete(storage, &account).await,
    }
}
