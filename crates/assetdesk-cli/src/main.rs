//! AssetDesk CLI
//!
//! Logs in to an AssetDesk server and shows the server monitoring
//! dashboard in the terminal.

mod api;
mod commands;
mod config;
mod monitor;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::SettingsManager;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "assetdesk")]
#[command(author, version, about = "AssetDesk - IT asset management client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store an access token
    Login {
        /// Username (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
        /// Password (prompted if omitted)
        #[arg(short, long, env = "ASSETDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored access token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Client configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Server monitoring dashboard (Zabbix)
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the AssetDesk server URL
    SetServer {
        /// Server URL (e.g., http://desk.example.com:5000)
        url: String,
    },
    /// Show current configuration
    Show,
}

#[derive(Subcommand)]
enum MonitorAction {
    /// Set up the Zabbix connection. Saved only if the connection test passes.
    Configure {
        /// Zabbix URL (http:// or https://)
        #[arg(long)]
        url: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long, env = "ZABBIX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Zabbix API version, e.g. 6.0
        #[arg(long)]
        api_version: Option<String>,
        /// Poll automatically in `monitor watch`
        #[arg(long)]
        auto_refresh: Option<bool>,
        /// Seconds between polls (30-600)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show the saved monitoring configuration
    Show,
    /// Fetch and display metrics once
    Refresh,
    /// Keep the dashboard open, refreshing at the configured interval
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "assetdesk=debug"
        } else {
            "assetdesk=warn"
        })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let manager = SettingsManager::from_env()?;
    debug!("Using settings at {}", manager.settings_path().display());

    let result = match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&manager, username, password).await
        }
        Commands::Logout => commands::auth::logout(&manager).await,
        Commands::Whoami => commands::auth::whoami(&manager).await,
        Commands::Config { action } => match action {
            ConfigAction::SetServer { url } => commands::config::set_server(&manager, &url).await,
            ConfigAction::Show => commands::config::show(&manager).await,
        },
        Commands::Monitor { action } => match action {
            MonitorAction::Configure {
                url,
                username,
                password,
                api_version,
                auto_refresh,
                interval,
            } => {
                commands::monitor::configure(
                    &manager,
                    commands::monitor::ConfigureArgs {
                        url,
                        username,
                        password,
                        api_version,
                        auto_refresh,
                        interval,
                    },
                )
                .await
            }
            MonitorAction::Show => commands::monitor::show(&manager).await,
            MonitorAction::Refresh => commands::monitor::refresh(&manager).await,
            MonitorAction::Watch => commands::monitor::watch(&manager).await,
        },
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    result
}
