use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lockgate_core::paths::default_store_path;
use lockgate_core::{DigestProvider, FileTokenStore, GateConfig, SubmitOutcome, UnlockGate};

#[derive(Parser)]
#[command(name = "lockgate")]
#[command(about = "Credential gate control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the allow-list digest for a code
    Hash {
        code: String,
    },

    /// Report whether the gate is unlocked
    Status {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Submit a code against the configured allow-list
    Unlock {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        store: Option<PathBuf>,
        code: String,
    },

    /// Clear the persisted unlock token
    Reset {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Hash { code } => hash_command(&code).await,
        Commands::Status { config, store } => status_command(config, store),
        Commands::Unlock {
            config,
            store,
            code,
        } => unlock_command(config, store, &code).await,
        Commands::Reset { config, store } => reset_command(config, store),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<GateConfig> {
    match path {
        Some(path) => {
            let data = std::fs::read(&path)
                .with_context(|| format!("read config {}", path.display()))?;
            let config: GateConfig =
                serde_json::from_slice(&data).with_context(|| "parse config")?;
            Ok(config)
        }
        None => Ok(GateConfig::default()),
    }
}

fn open_store(path: Option<PathBuf>) -> Result<Arc<FileTokenStore>> {
    let path = match path {
        Some(path) => path,
        None => default_store_path()?,
    };
    let store =
        FileTokenStore::open(&path).with_context(|| format!("open store {}", path.display()))?;
    Ok(Arc::new(store))
}

fn build_gate(config: Option<PathBuf>, store: Option<PathBuf>) -> Result<UnlockGate> {
    let config = load_config(config)?;
    let store = open_store(store)?;
    Ok(UnlockGate::new(config, store)?)
}

async fn hash_command(code: &str) -> Result<()> {
    let provider = DigestProvider::new();
    println!("{}", provider.digest_hex(code.trim()).await);
    Ok(())
}

fn status_command(config: Option<PathBuf>, store: Option<PathBuf>) -> Result<()> {
    let gate = build_gate(config, store)?;
    if gate.is_unlocked() {
        println!("unlocked");
    } else {
        println!("locked");
    }
    Ok(())
}

async fn unlock_command(
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    code: &str,
) -> Result<()> {
    let gate = build_gate(config, store)?;
    match gate.submit(code).await {
        SubmitOutcome::Unlocked { message } => {
            println!("{message}");
            Ok(())
        }
        SubmitOutcome::EmptyInput { message }
        | SubmitOutcome::Rejected { message, .. }
        | SubmitOutcome::Failed { message, .. } => {
            eprintln!("{message}");
            std::process::exit(1);
        }
        SubmitOutcome::Busy => {
            eprintln!("verification already in progress");
            std::process::exit(1);
        }
    }
}

fn reset_command(config: Option<PathBuf>, store: Option<PathBuf>) -> Result<()> {
    let gate = build_gate(config, store)?;
    gate.reset()?;
    println!("locked");
    Ok(())
}
