//! `fogvault` -- CLI binary for the fogvault plugin manager.
//!
//! Provides the following subcommands:
//!
//! - `fogvault serve` -- Run the REST API.
//! - `fogvault plugin install` -- Download and install a plugin.
//! - `fogvault snapshot` -- List, create, restore and delete plugin snapshots.
//! - `fogvault config` -- Show the resolved configuration.

use clap::{Parser, Subcommand};

mod commands;

/// fogvault plugin manager CLI.
#[derive(Parser)]
#[command(name = "fogvault", about = "fogvault plugin installer and snapshot manager", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API until Ctrl+C.
    Serve(commands::serve::ServeArgs),

    /// Install plugins.
    Plugin {
        #[command(subcommand)]
        action: PluginCmd,
    },

    /// Manage plugin snapshots.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCmd,
    },

    /// Show resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

/// Subcommands for `fogvault plugin`.
#[derive(Subcommand)]
enum PluginCmd {
    /// Download, verify and install a plugin archive.
    Install(commands::plugin_cmd::InstallArgs),
}

/// Subcommands for `fogvault snapshot`.
#[derive(Subcommand)]
enum SnapshotCmd {
    /// List stored snapshots.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Create a snapshot of every plugin tree.
    Create,

    /// Restore the plugin trees from a snapshot.
    Restore {
        /// Snapshot id (Unix timestamp).
        id: String,
    },

    /// Delete a snapshot.
    Delete {
        /// Snapshot id (Unix timestamp).
        id: String,
    },
}

/// Subcommands for `fogvault config`.
#[derive(Subcommand)]
enum ConfigCmd {
    /// Show the full resolved configuration.
    Show,

    /// Show a specific configuration section.
    Section {
        /// Section name (e.g., "paths", "install", "snapshot").
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => commands::serve::run(config, args).await?,
        Commands::Plugin { action } => match action {
            PluginCmd::Install(args) => commands::plugin_cmd::install(config, args).await?,
        },
        Commands::Snapshot { action } => {
            use commands::snapshot_cmd;
            let manager = snapshot_cmd::manager(config);
            match action {
                SnapshotCmd::List { json } => snapshot_cmd::list(&manager, json).await?,
                SnapshotCmd::Create => snapshot_cmd::create(&manager).await?,
                SnapshotCmd::Restore { id } => snapshot_cmd::restore(&manager, &id).await?,
                SnapshotCmd::Delete { id } => snapshot_cmd::delete(&manager, &id).await?,
            }
        }
        Commands::Config { action } => match action {
            ConfigCmd::Show => commands::config_cmd::config_show(&config),
            ConfigCmd::Section { name } => commands::config_cmd::config_section(&config, &name)?,
        },
    }

    Ok(())
}
