use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use blockhost_block::Plugin;
use blockhost_config::{HostConfig, Overrides};
use blockhost_echo_plugin::EchoPlugin;
use blockhost_lifecycle::TriggerLifecycle;
use blockhost_trigger_store::{SqliteTriggerStore, TriggerKey, TriggerStore};

/// Blockhost - hosts plugin blocks behind an HTTP API
#[derive(Parser)]
#[command(name = "blockhost")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a JSON config file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Address to listen on (overrides config and environment)
  #[arg(long, global = true)]
  listen_addr: Option<SocketAddr>,

  /// Trigger store location, e.g. sqlite://plugin.sqlite
  #[arg(long, global = true)]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve the echo plugin until interrupted
  Serve,

  /// Manage the trigger store
  Db {
    #[command(subcommand)]
    command: DbCommand,
  },

  /// Inspect remembered triggers
  Triggers {
    #[command(subcommand)]
    command: TriggersCommand,
  },
}

#[derive(Subcommand)]
enum DbCommand {
  /// Create the trigger store schema if it does not exist
  Init,
}

#[derive(Subcommand)]
enum TriggersCommand {
  /// Print every remembered trigger as JSON
  List,

  /// Remove a remembered trigger without running its cleanup
  Forget {
    #[arg(long)]
    plugin: String,

    #[arg(long)]
    trigger: String,

    #[arg(long)]
    endpoint: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let overrides = Overrides {
    listen_addr: cli.listen_addr,
    database_url: cli.database_url,
  };
  let config = HostConfig::load(cli.config.as_deref(), overrides).context("failed to load config")?;

  let Some(command) = cli.command else {
    println!("blockhost - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    match command {
      Commands::Serve => serve(config).await,
      Commands::Db {
        command: DbCommand::Init,
      } => db_init(&config).await,
      Commands::Triggers { command } => match command {
        TriggersCommand::List => list_triggers(&config).await,
        TriggersCommand::Forget {
          plugin,
          trigger,
          endpoint,
        } => forget_trigger(&config, TriggerKey::new(plugin, trigger, endpoint)).await,
      },
    }
  })
}

async fn serve(config: HostConfig) -> Result<()> {
  let cancel = CancellationToken::new();
  let shutdown = cancel.clone();
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => tracing::info!("shutdown requested"),
      Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
    }
    shutdown.cancel();
  });

  let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(EchoPlugin::new())];
  blockhost_server::serve(config, plugins, cancel)
    .await
    .context("server failed")
}

async fn open_store(config: &HostConfig) -> Result<SqliteTriggerStore> {
  let store = SqliteTriggerStore::connect(&config.database_url)
    .await
    .with_context(|| format!("failed to open trigger store: {}", config.database_url))?;
  store
    .initialize()
    .await
    .context("failed to initialize trigger store")?;
  Ok(store)
}

async fn db_init(config: &HostConfig) -> Result<()> {
  let store = open_store(config).await?;
  store.close().await;
  eprintln!("Trigger store ready: {}", config.database_url);
  Ok(())
}

async fn list_triggers(config: &HostConfig) -> Result<()> {
  let store = open_store(config).await?;
  let rows = store.list().await.context("failed to list triggers")?;
  store.close().await;

  // Unreadable rows are listed with their error instead of their values.
  let output: Vec<serde_json::Value> = rows
    .iter()
    .map(|row| match row.decode() {
      Ok(record) => json!({
        "plugin": record.plugin,
        "trigger": record.trigger,
        "endpoint": record.endpoint,
        "blockConfig": record.block_config,
        "pluginConfig": record.plugin_config,
        "cleanupData": record.cleanup_data,
        "updatedAt": row.updated_at,
      }),
      Err(e) => json!({
        "plugin": row.plugin,
        "trigger": row.trigger,
        "endpoint": row.endpoint,
        "error": e.to_string(),
        "updatedAt": row.updated_at,
      }),
    })
    .collect();

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn forget_trigger(config: &HostConfig, key: TriggerKey) -> Result<()> {
  let store = Arc::new(open_store(config).await?);
  let lifecycle = TriggerLifecycle::new(store.clone());
  let removed = lifecycle
    .forget(&key)
    .await
    .with_context(|| format!("failed to forget trigger {}", key))?;
  store.close().await;

  if removed {
    eprintln!("Forgot {}", key);
  } else {
    eprintln!("No remembered trigger {}", key);
  }
  Ok(())
}
