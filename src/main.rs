//! achievement-workflow - student achievement verification service
use achievement_workflow::config::Config;
use achievement_workflow::identity::DirectoryImport;
use achievement_workflow::store::SledStores;
use achievement_workflow::{AppState, create_app};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "achievement-workflow", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the http server
    Serve(ServeCommand),
    /// load lecturers and students from a json file
    ImportDirectory(ImportCommand),
}

/// settings shared by every command
#[derive(Args, Debug)]
struct StoreArgs {
    /// path to config file (toml format)
    #[arg(short, long, env = "ACHIEVEMENTS_CONFIG")]
    config: Option<PathBuf>,

    /// sled database for references and profiles
    #[arg(long, env = "ACHIEVEMENTS_LEDGER_PATH")]
    ledger_path: Option<PathBuf>,

    /// sled database for achievement content
    #[arg(long, env = "ACHIEVEMENTS_CONTENT_PATH")]
    content_path: Option<PathBuf>,

    /// log level
    #[arg(long, env = "ACHIEVEMENTS_LOG_LEVEL")]
    log_level: Option<String>,
}

impl StoreArgs {
    /// defaults, then config file, then flags
    fn load(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(ledger_path) = &self.ledger_path {
            config.ledger_path = ledger_path.clone();
        }
        if let Some(content_path) = &self.content_path {
            config.content_path = content_path.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[command(flatten)]
    store: StoreArgs,

    /// address to listen on
    #[arg(long, env = "ACHIEVEMENTS_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// timeout for a single storage operation, in seconds
    #[arg(long, env = "ACHIEVEMENTS_STORAGE_TIMEOUT_SECS")]
    storage_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct ImportCommand {
    #[command(flatten)]
    store: StoreArgs,

    /// json file with `lecturers` and `students` arrays
    file: PathBuf,
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn open_stores(config: &Config) -> Result<SledStores> {
    SledStores::open(&config.ledger_path, &config.content_path).with_context(|| {
        format!(
            "failed to open databases at {:?} and {:?}",
            config.ledger_path, config.content_path
        )
    })
}

impl ServeCommand {
    async fn run(self) -> Result<()> {
        let mut config = self.store.load()?;
        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(secs) = self.storage_timeout_secs {
            config.storage_timeout_secs = secs;
        }
        init_logging(&config.log_level)?;

        info!("Ledger database: {:?}", config.ledger_path);
        info!("Content database: {:?}", config.content_path);
        let stores = open_stores(&config)?;

        let state = AppState::new(
            Arc::new(stores.directory),
            Arc::new(stores.contents),
            Arc::new(stores.ledger),
        )
        .with_page_limits(config.page_limits())
        .with_storage_timeout(config.storage_timeout());
        let app = create_app(state);

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        info!("Listening on {}", config.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("Server stopped");
        Ok(())
    }
}

impl ImportCommand {
    fn run(self) -> Result<()> {
        let config = self.store.load()?;
        init_logging(&config.log_level)?;

        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read directory file: {:?}", self.file))?;
        let import: DirectoryImport =
            serde_json::from_str(&content).context("failed to parse directory file")?;

        let stores = open_stores(&config)?;
        let (lecturers, students) = stores.directory.import(&import)?;
        stores.flush()?;

        info!(lecturers, students, "directory imported");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::ImportDirectory(cmd) => cmd.run(),
    }
}
