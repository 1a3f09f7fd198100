//! # pgts
//!
//! Command-line client for the PGTS tooling service: run a query or browse
//! the Object Explorer tree.

#![deny(unsafe_code)]

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pgts_client::object_explorer::{load_artifact, load_root_node};
use pgts_client::PgtsClient;
use pgts_rpc::contracts::ConnectionOptions;
use pgts_settings::PgtsSettings;
use tracing::info;

/// PGTS command-line client.
#[derive(Parser, Debug)]
#[command(name = "pgts", about = "PGTS tooling-service client")]
struct Cli {
    /// Settings file (defaults to `~/.pgts/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Tooling-service base URL (overrides settings).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Database host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database user.
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database name.
    #[arg(long, global = true)]
    dbname: Option<String>,

    /// Log level filter (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print connection details.
    Connect,
    /// Run a SQL statement.
    Query {
        /// SQL text.
        sql: String,
    },
    /// List the children of a tree path; the roots when no path is given.
    Tree {
        /// Tree path to expand.
        path: Option<String>,
    },
}

impl Cli {
    fn load_settings(&self) -> Result<PgtsSettings> {
        self.load_settings_with_env(|name| std::env::var(name).ok())
    }

    fn load_settings_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<PgtsSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(pgts_settings::settings_path);
        let mut settings = pgts_settings::load_settings_with_env(&path, env)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        if let Some(url) = &self.base_url {
            settings.server.base_url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn connection_options(&self, settings: &PgtsSettings) -> ConnectionOptions {
        let defaults = &settings.connection;
        ConnectionOptions {
            host: self.host.clone().unwrap_or_else(|| defaults.host.clone()),
            user: self.user.clone().unwrap_or_else(|| defaults.user.clone()),
            password: std::env::var("PGTS_PASSWORD").unwrap_or_default(),
            dbname: self.dbname.clone().unwrap_or_else(|| defaults.dbname.clone()),
        }
    }
}

async fn connect(client: &PgtsClient, options: ConnectionOptions) -> Result<()> {
    let session = client.open().await.context("Failed to open PGTS session")?;
    info!(session_id = %session, "session open");
    client.connect(options).await.context("Failed to send connect")?;
    let _ = client
        .wait_for_connection()
        .await
        .context("Database connection failed")?;
    let _ = client
        .wait_for_object_explorer()
        .await
        .context("Object Explorer session failed")?;
    Ok(())
}

async fn run(cli: &Cli, client: &PgtsClient) -> Result<()> {
    connect(client, cli.connection_options(client.settings())).await?;

    match &cli.command {
        Command::Connect => {
            let snapshot = client.state().snapshot();
            let Some(info) = snapshot.connection else {
                bail!("no connection info");
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("connected: {}", info.connection_id.unwrap_or_default());
                if let Some(oe) = snapshot.object_explorer {
                    println!("object explorer: {}", oe.session_id);
                }
            }
        }
        Command::Query { sql } => {
            let results = client.execute(sql).await.context("Query failed")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render::query_table(&results));
            }
        }
        Command::Tree { path } => {
            let artifact = client
                .state()
                .snapshot()
                .object_explorer_session_id()
                .map(str::to_owned)
                .context("No Object Explorer session")?;
            let nodes = match path {
                Some(path) => {
                    client
                        .load_child_nodes(&artifact, path)
                        .await
                        .with_context(|| format!("Failed to expand {path}"))?
                        .tree_nodes
                }
                None => load_artifact(&artifact)
                    .iter()
                    .map(|root| load_root_node(&artifact, root))
                    .collect(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                print!("{}", render::tree_nodes(&nodes));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    if settings.logging.json {
        pgts_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        pgts_core::logging::init_subscriber(&settings.logging.level);
    }
    if pgts_settings::init_settings(settings.clone()).is_err() {
        tracing::debug!("settings already initialized");
    }

    let client = PgtsClient::new(settings).context("Failed to build client")?;
    let result = run(&cli, &client).await;
    client.close().await;
    result
}
