//! dashrun backend binary: selects a store, builds the engine, serves HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use dashrun_engine::{Engine, EngineConfig, GameRegistry, Memory};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod api;
mod sqlite;

use api::AppState;
use sqlite::{ServiceStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "dashrun-service", about = "dashrun reward backend")]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to bind.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Path to the SQLite database. Omit to run against the ephemeral
    /// in-memory store (local/dev only: state is lost on restart).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Reject submissions whose session token cannot be verified instead of
    /// persisting them flagged.
    #[arg(long, default_value_t = false)]
    strict_sessions: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let store = match &args.db {
        Some(path) => {
            info!(path = %path.display(), "using sqlite store");
            ServiceStore::Sqlite(SqliteStore::open(path)?)
        }
        None => {
            info!("using in-memory store; state will not survive a restart");
            ServiceStore::Memory(Memory::default())
        }
    };

    let config = EngineConfig {
        strict_sessions: args.strict_sessions,
        ..EngineConfig::default()
    };
    let engine = Arc::new(Engine::new(store, GameRegistry::default(), config));
    let app = api::router(AppState { engine });

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, strict_sessions = args.strict_sessions, "dashrun service listening");
    axum::serve(listener, app).await.context("serve")?;
    Ok(())
}
